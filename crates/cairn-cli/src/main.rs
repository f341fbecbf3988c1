mod cli;
mod commands;
mod error;
mod walk;

use clap::Parser;

use cli::{Cli, Command};
use error::{exit_code, Error};

fn main() {
    let cli = Cli::parse();
    cairn_util::init_logging(&cli.log);

    let file_config = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(exit_code(&err));
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli.command, file_config.as_ref()));
    match result {
        Ok(()) => {}
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            std::process::exit(exit_code(&err));
        }
    }
}

async fn run(command: Command, file_config: Option<&cairn_config::ConfigDocument>) -> Result<(), Error> {
    match command {
        Command::CreateFiles(args) => commands::create_files(args, file_config).await,
        Command::CreateImages(_) => Err(Error::StillNotImplemented("create-images")),
        Command::List(args) => commands::list(args).await,
        Command::Test(args) => commands::test(args, file_config).await,
        Command::Compare(_) => Err(Error::StillNotImplemented("compare")),
        Command::Restore(args) => commands::restore(args, file_config).await,
        Command::Convert(_) => Err(Error::StillNotImplemented("convert")),
        Command::GenerateEncryptionKeys(args) => commands::generate_encryption_keys(&args.output_base, args.bits),
        Command::GenerateSignatureKeys(args) => commands::generate_signature_keys(&args.output_base, args.bits),
    }
}
