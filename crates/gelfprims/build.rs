fn main() {
    for (var, key) in [
        ("TARGET", "GELFPRIMS_BUILD_TARGET"),
        ("PROFILE", "GELFPRIMS_BUILD_PROFILE"),
    ] {
        if let Ok(value) = std::env::var(var) {
            println!("cargo:rustc-env={key}={value}");
        }
        println!("cargo:rerun-if-env-changed={var}");
    }
}
