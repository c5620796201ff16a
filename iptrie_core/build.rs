fn main() {
    use std::env;
    use std::path::PathBuf;

    println!("cargo:rerun-if-changed=src");
    println!("cargo:rerun-if-changed=cbindgen.toml");

    let Ok(crate_dir) = env::var("CARGO_MANIFEST_DIR") else {
        return;
    };
    let out_dir = PathBuf::from(&crate_dir).join("include");

    // the header is a convenience for C hosts; never fail the Rust build over it
    let result = std::fs::create_dir_all(&out_dir)
        .map_err(|e| e.to_string())
        .and_then(|_| {
            cbindgen::Config::from_file(PathBuf::from(&crate_dir).join("cbindgen.toml"))
                .map_err(|e| e.to_string())
        })
        .and_then(|config| {
            cbindgen::Builder::new()
                .with_config(config)
                .with_crate(&crate_dir)
                .generate()
                .map_err(|e| e.to_string())
        });
    match result {
        Ok(bindings) => {
            bindings.write_to_file(out_dir.join("iptrie.h"));
        }
        Err(e) => println!("cargo:warning=iptrie.h not generated: {e}"),
    }
}
