// Enables the tests against the real library when PGQUERY_LIBRARY is set at
// build time; without it they are reported as ignored.

fn main() {
    println!("cargo:rustc-check-cfg=cfg(pgquery_library)");
    println!("cargo:rerun-if-env-changed=PGQUERY_LIBRARY");
    println!("cargo:rerun-if-changed=build.rs");

    if std::env::var_os("PGQUERY_LIBRARY").is_some_and(|path| !path.is_empty()) {
        println!("cargo:rustc-cfg=pgquery_library");
    }
}
