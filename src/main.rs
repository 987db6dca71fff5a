// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::error::Error;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use lightstate::config::LightingConfig;
use tracing::info;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A lighting state engine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Loads and verifies a lighting configuration.
    Verify {
        /// The path to the lighting config.
        config_path: String,
    },
    /// Applies the initial states, and optionally one more state, then prints
    /// the frames they produce.
    Run {
        /// The path to the lighting config.
        config_path: String,
        /// A state to apply to a fixture after the initial states.
        #[arg(short, long, num_args = 2, value_names = ["FIXTURE", "STATE"])]
        apply: Option<Vec<String>>,
        /// How long to run for.
        #[arg(short, long, default_value = "5s")]
        duration: String,
    },
    /// Rewrites legacy states as phase lists.
    Normalize {
        /// The path to the lighting config.
        config_path: String,
        /// Where to write the result. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Verify { config_path } => {
            let config = LightingConfig::deserialize(&PathBuf::from(&config_path))?;
            let rig = config.build()?;

            println!("Universes (count: {}):", rig.universes().len());
            for (index, universe) in rig.universes().iter().enumerate() {
                println!(
                    "- {}: {} ({} channels, {} patched)",
                    index,
                    universe.name(),
                    universe.size(),
                    universe.patch().len()
                );
            }

            println!("\nGroups (count: {}):", rig.registry().len());
            for group in rig.registry().groups() {
                println!("- {} ({} channel types)", group.name(), group.channel_types().len());
                for state in group.states() {
                    println!(
                        "  - {}: {} phase(s){}",
                        state.key(),
                        state.phase_count(),
                        if state.is_flashing() { ", flashing" } else { "" }
                    );
                }
            }

            println!("\nFixtures:");
            for fixture in rig.fixtures() {
                println!("- {}", fixture);
            }
        }
        Commands::Run {
            config_path,
            apply,
            duration,
        } => {
            let duration: Duration = DurationString::from_string(duration)?.into();
            let config = LightingConfig::deserialize(&PathBuf::from(&config_path))?;
            let rig = config.build()?;

            let (sender, receiver) = crossbeam_channel::unbounded::<(usize, Vec<u8>)>();
            for (index, universe) in rig.universes().iter().enumerate() {
                let sender = sender.clone();
                universe.buffer().set_dispatch(move |frame| {
                    let _ = sender.send((index, frame.to_vec()));
                });
            }
            drop(sender);

            rig.apply_initial_states()?;
            if let Some([fixture, state]) = apply.as_deref() {
                rig.apply_state(fixture, Some(state.as_str()), true)?;
            }

            let deadline = Instant::now() + duration;
            while let Ok((index, frame)) = receiver.recv_deadline(deadline) {
                let levels: Vec<String> = frame
                    .iter()
                    .skip(1)
                    .enumerate()
                    .filter(|(_, level)| **level > 0)
                    .map(|(channel, level)| format!("{}={}", channel, level))
                    .collect();
                println!("universe {}: [{}]", index, levels.join(", "));
            }

            info!("Run finished, clearing fixtures");
            rig.clear_all();
        }
        Commands::Normalize {
            config_path,
            output,
        } => {
            let config = LightingConfig::deserialize(&PathBuf::from(&config_path))?;
            let normalized = config.normalize()?;
            // Make sure the result still builds before writing it out.
            normalized.build()?;
            normalized.save(&PathBuf::from(output.unwrap_or(config_path)))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use clap::Parser;

    use super::{Cli, Commands};

    #[test]
    fn test_run_without_apply() {
        let cli = Cli::try_parse_from(["lightstate", "run", "lighting.yaml"]).unwrap();
        match cli.command {
            Commands::Run {
                config_path,
                apply,
                duration,
            } => {
                assert_eq!("lighting.yaml", config_path);
                assert!(apply.is_none());
                assert_eq!("5s", duration);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_with_apply() {
        let cli = Cli::try_parse_from([
            "lightstate",
            "run",
            "lighting.yaml",
            "--apply",
            "par2",
            "chase",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { apply, .. } => {
                assert_eq!(Some(vec!["par2".to_string(), "chase".to_string()]), apply);
            }
            _ => panic!("expected run"),
        }

        // A fixture without a state is rejected.
        assert!(Cli::try_parse_from(["lightstate", "run", "lighting.yaml", "--apply", "par2"]).is_err());
    }
}
