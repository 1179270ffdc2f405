use std::process::ExitCode;

use clap::Parser;

use bleio::{Args, RunSettings, fake_hardware_client, real_hardware_client, run_with_settings};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let mut stdout = std::io::stdout();

    let run_result = async {
        let settings = RunSettings::builder()
            .maybe_log_level(args.log_level())
            .maybe_output_format(args.output_format())
            .connect_options(args.connect_options())
            .build();
        let (command, maybe_fake_args) = args.into_command_and_fake_args()?;
        let hardware_client = match maybe_fake_args {
            Some(fake_args) => fake_hardware_client(fake_args).await?,
            None => real_hardware_client().await?,
        };

        run_with_settings(command, &mut stdout, hardware_client, settings).await
    }
    .await;

    match run_result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}
