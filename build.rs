use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
	println!("cargo:rerun-if-changed=build.rs");
	println!("cargo:rerun-if-changed=memory.x");

	// Host builds (tests) link normally.
	let target = env::var("TARGET").unwrap_or_default();
	if !target.starts_with("thumbv6m-none-eabi") {
		return;
	}

	// cortex-m-rt's link.x looks for memory.x in the search path.
	let out = PathBuf::from(env::var("OUT_DIR").unwrap());
	fs::write(out.join("memory.x"), include_bytes!("memory.x")).unwrap();
	println!("cargo:rustc-link-search={}", out.display());

	println!("cargo:rustc-link-arg-bins=--nmagic");
	println!("cargo:rustc-link-arg-bins=-Tlink.x");

	if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
		println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
	}
}
