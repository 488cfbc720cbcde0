//! kinetree command line entry point

mod config;
mod document;

use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

use kinetree_core::{Link, Robot};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "kinetree")]
#[command(about = "Convert and check robot kinematic trees (URDF, CSV, RON)", long_about = None)]
struct Cli {
    /// RON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Significant digits for written numbers (overrides the config file)
    #[arg(long, global = true)]
    digits: Option<usize>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a robot and write it in the format of the output extension
    Convert { input: PathBuf, output: PathBuf },
    /// Check a robot and list every problem found
    Validate { input: PathBuf },
    /// Print the link tree
    Tree { input: PathBuf },
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinetree_cli=info,kinetree_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    if let Some(digits) = cli.digits {
        config.significant_digits = digits;
    }
    tracing::debug!("Using {:?}", config);

    match cli.cmd {
        Commands::Convert { input, output } => {
            let robot = document::load(&input, &config)?;
            document::save(&robot, &output, &config)?;
            println!(
                "Converted '{}' ({} links) to {}",
                robot.name(),
                robot.link_count(),
                output.display()
            );
        }
        Commands::Validate { input } => {
            let robot = document::load(&input, &config)?;
            let problems = problems(&robot);
            if !problems.is_empty() {
                for problem in &problems {
                    println!("{}", problem);
                }
                bail!("{} problem(s) in {}", problems.len(), input.display());
            }
            println!("'{}' is valid ({} links)", robot.name(), robot.link_count());
        }
        Commands::Tree { input } => {
            let robot = document::load(&input, &config)?;
            print!("{}", render_tree(&robot));
        }
    }

    Ok(())
}

/// Structural problems, then missing required fields
fn problems(robot: &Robot) -> Vec<String> {
    let mut problems: Vec<String> = match robot.validate_structure() {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .iter()
            .map(|e| format!("{}: {}", e.kind(), e))
            .collect(),
    };
    problems.extend(
        robot
            .validate()
            .into_iter()
            .map(|missing| format!("missing required field: {}", missing)),
    );
    problems
}

fn render_tree(robot: &Robot) -> String {
    let mut out = format!("{}\n", robot.name());
    render_link(robot.base_link(), 1, &mut out);
    out
}

fn render_link(link: &Link, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match link.joint() {
        Some(joint) => out.push_str(&format!(
            "{}{} <- {} ({})\n",
            indent,
            link.name(),
            joint.name(),
            joint.joint_type()
        )),
        None => out.push_str(&format!("{}{}\n", indent, link.name())),
    }
    for child in link.children() {
        render_link(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinetree_core::{Joint, JointType};

    #[test]
    fn test_render_tree() {
        let mut robot = Robot::new("bot", Link::fixed_frame("base_link"));
        robot
            .add_child(
                "base_link",
                Link::fixed_frame("arm").with_joint(Joint::new("spin", JointType::Continuous)),
            )
            .unwrap();
        robot.add_child("arm", Link::fixed_frame("tool0")).unwrap();

        assert_eq!(
            render_tree(&robot),
            "bot\n  base_link\n    arm <- spin (continuous)\n      tool0 <- tool0_joint (fixed)\n"
        );
    }

    #[test]
    fn test_problems_lists_missing_fields() {
        let mut robot = Robot::new("bot", Link::fixed_frame("base_link"));
        robot
            .add_child(
                "base_link",
                Link::fixed_frame("slide").with_joint(Joint::new("rail", JointType::Prismatic)),
            )
            .unwrap();
        let problems = problems(&robot);
        assert_eq!(problems.len(), 4);
        assert_eq!(
            problems[0],
            "missing required field: robot[bot].joint[rail].limit.lower"
        );
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["kinetree", "convert", "a.urdf", "b.csv", "--digits", "3"])
            .unwrap();
        assert_eq!(cli.digits, Some(3));
        assert!(matches!(cli.cmd, Commands::Convert { .. }));
    }
}
