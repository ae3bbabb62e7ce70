use std::fmt;

/// Values stamped in by `build.rs`; `unknown` when a probe failed.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: &'static str,
    pub tree: &'static str,
    pub built_at: &'static str,
    pub target: &'static str,
    pub profile: &'static str,
    pub rustc: &'static str,
}

pub fn current() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("ALLOTMENT_BUILD_HASH").unwrap_or("unknown"),
        tree: option_env!("ALLOTMENT_BUILD_STATUS").unwrap_or("unknown"),
        built_at: option_env!("ALLOTMENT_BUILD_TIMESTAMP").unwrap_or("unknown"),
        target: option_env!("ALLOTMENT_BUILD_TARGET").unwrap_or("unknown"),
        profile: option_env!("ALLOTMENT_BUILD_PROFILE").unwrap_or("unknown"),
        rustc: option_env!("ALLOTMENT_BUILD_RUSTC").unwrap_or("unknown"),
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "allotment {} ({} {})", self.version, self.commit, self.tree)?;
        writeln!(f, "built   {} [{}]", self.built_at, self.profile)?;
        writeln!(f, "target  {}", self.target)?;
        write!(f, "rustc   {}", self.rustc)
    }
}
