/// Build version, overridable at compile time through `PLATEMARK_VERSION`.
pub const VERSION: &str = match option_env!("PLATEMARK_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};
