// Build script to compile Protocol Buffer definitions

fn main() -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all("src/generated")?;

    // Compile protobuf messages plus the checkin client and server
    tonic_build::configure()
        .out_dir("src/generated")
        .compile_protos(&["../../proto/stethoscope.proto"], &["../../proto/"])?;

    // Tell Cargo to rerun if proto files change
    println!("cargo:rerun-if-changed=../../proto/stethoscope.proto");

    Ok(())
}
