use fisor_env::{ENV_LIST, EnvSpec};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct ListEnvsArg {}

pub(crate) fn run(_arg: &ListEnvsArg) -> anyhow::Result<()> {
    println!("{:>3}  {:<42} {:>9} {:>10}", "id", "name", "max_steps", "reward");
    for (id, name) in ENV_LIST.iter().enumerate() {
        match EnvSpec::lookup(name) {
            Some(spec) => println!(
                "{id:>3}  {name:<42} {:>9} {:>10}",
                spec.max_episode_steps,
                format!("{}..{}", spec.min_episode_reward, spec.max_episode_reward),
            ),
            None => println!("{id:>3}  {name:<42} {:>9} {:>10}", "-", "-"),
        }
    }
    Ok(())
}
