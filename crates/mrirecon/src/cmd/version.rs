use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("mrirecon {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: mrirecon");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("MRIRECON_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("fork_per_connection: {}", cfg!(unix));
    let registry = mrirecon_pipeline::PluginRegistry::with_builtins();
    let modules: Vec<&str> = registry.module_ids().collect();
    println!("plugins: {}", modules.join(", "));

    Ok(SUCCESS)
}
