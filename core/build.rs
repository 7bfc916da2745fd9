use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Proto sources live at the workspace root, one level up from core/
    let proto_root = "../proto";
    let tweet_proto = format!("{proto_root}/clima/v1/tweet.proto");

    println!("cargo:rerun-if-changed={tweet_proto}");

    // Fall back to the vendored protoc unless the environment provides one
    if std::env::var_os("PROTOC").is_none() {
        // SAFETY: build scripts are single-threaded at this point
        unsafe {
            std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
        }
    }

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    // Gateway needs the client, the service needs the server; reflection
    // needs the encoded descriptor set.
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(out_dir.join("clima_descriptor.bin"))
        .compile_protos(&[&tweet_proto], &[proto_root])?;

    Ok(())
}
