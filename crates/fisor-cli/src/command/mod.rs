use clap::{Parser, Subcommand};

use self::{generate_dataset::GenerateDatasetArg, list_envs::ListEnvsArg, train::TrainArg};

mod generate_dataset;
mod list_envs;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    /// What mode to run the program in
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Train an offline safe-RL agent
    Train(#[clap(flatten)] TrainArg),
    /// Collect a behavior dataset from a benchmark environment
    GenerateDataset(#[clap(flatten)] GenerateDatasetArg),
    /// Print the environment list with the indices `--env-id` selects
    ListEnvs(#[clap(flatten)] ListEnvsArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Train(arg) => train::run(&arg)?,
        Mode::GenerateDataset(arg) => generate_dataset::run(&arg)?,
        Mode::ListEnvs(arg) => list_envs::run(&arg)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn test_command_definition() {
        CommandArgs::command().debug_assert();
    }

    #[test]
    fn test_train_defaults() {
        let args =
            CommandArgs::try_parse_from(["fisor", "train", "--config", "fisor.yaml"]).unwrap();
        let Mode::Train(arg) = args.mode else {
            panic!("expected train mode");
        };
        assert_eq!(arg.env_id, 30);
        assert_eq!(arg.ratio, 1.0);
        assert!(arg.project.is_empty());
        assert!(arg.experiment_name.is_empty());
    }

    #[test]
    fn test_train_requires_config() {
        assert!(CommandArgs::try_parse_from(["fisor", "train"]).is_err());
    }
}
