use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    // Rerun whenever a shader changes so the copy next to the binaries stays fresh.
    println!("cargo:rerun-if-changed=shaders");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let shaders_src = manifest_dir.join("shaders");
    if !shaders_src.exists() {
        return Ok(());
    }

    // OUT_DIR is target/<profile>/build/<crate>-<hash>/out, the binaries live in target/<profile>.
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let Some(profile_dir) = out_dir.ancestors().nth(3) else {
        return Ok(());
    };

    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[shaders_src], profile_dir, &copy_options)?;

    Ok(())
}
