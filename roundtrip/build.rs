use embedgen::{Generator, Options};
use std::{env, fs::File, path::PathBuf};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("set by cargo"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("set by cargo"));
    let site = manifest_dir.join("fixtures").join("site");

    println!("cargo:rerun-if-changed={}", site.display());

    for (namespace, compress) in [("plain", false), ("packed", true)] {
        let mut generator = Generator::new(Options {
            namespace: namespace.to_string(),
            variable: "SITE".to_string(),
            compress,
            strip_prefix: site.to_string_lossy().into_owned(),
            ..Options::default()
        });

        if let Err(error) = generator.add(&site) {
            panic!("{:?}", miette::Report::new(error));
        }

        let file = File::create(out_dir.join(format!("{}.rs", namespace)))
            .expect("OUT_DIR is writable");

        if let Err(error) = generator.write_to(file) {
            panic!("{:?}", miette::Report::new(error));
        }
    }
}
