//! Reading and writing robots in every supported format

use std::fmt::Display;
use std::path::Path;

use anyhow::{anyhow, bail};

use kinetree_core::table::{read_csv_file, write_csv_file};
use kinetree_core::urdf::{read_urdf_file, write_urdf_file};
use kinetree_core::{ErrorKind, Project, Robot};

use crate::config::CliConfig;

/// File format, picked by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Urdf,
    Csv,
    Project,
}

impl Format {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match extension.as_deref() {
            Some("urdf") | Some("xml") => Ok(Format::Urdf),
            Some("csv") => Ok(Format::Csv),
            Some("ron") => Ok(Format::Project),
            _ => bail!(
                "cannot tell the format of {} (expected .urdf, .xml, .csv or .ron)",
                path.display()
            ),
        }
    }
}

/// Wrap a structured error, keeping its kind and every offending name
fn structured(kind: ErrorKind, error: impl Display, names: Vec<String>) -> anyhow::Error {
    if names.is_empty() {
        anyhow!("{}: {}", kind, error)
    } else {
        anyhow!("{}: {}\n  {}", kind, error, names.join("\n  "))
    }
}

pub fn load(path: &Path, config: &CliConfig) -> anyhow::Result<Robot> {
    match Format::from_path(path)? {
        Format::Urdf => {
            read_urdf_file(path).map_err(|e| structured(e.kind(), &e, e.offending_names()))
        }
        Format::Csv => {
            let name = config
                .robot_name
                .clone()
                .or_else(|| {
                    path.file_stem()
                        .and_then(|s| s.to_str())
                        .map(str::to_string)
                })
                .unwrap_or_else(|| "robot".to_string());
            read_csv_file(&name, path).map_err(|e| structured(e.kind(), &e, e.offending_names()))
        }
        Format::Project => Project::load(path)
            .map(|project| project.robot)
            .map_err(|e| structured(e.kind(), &e, e.offending_names())),
    }
}

pub fn save(robot: &Robot, path: &Path, config: &CliConfig) -> anyhow::Result<()> {
    match Format::from_path(path)? {
        Format::Urdf => write_urdf_file(robot, path, &config.serialize_options())
            .map_err(|e| structured(e.kind(), &e, e.offending_names())),
        Format::Csv => write_csv_file(robot, path, &config.number_format())
            .map_err(|e| structured(e.kind(), &e, e.offending_names())),
        Format::Project => Project::with_robot(robot.name(), robot.clone())
            .save(path)
            .map_err(|e| structured(e.kind(), &e, e.offending_names())),
    }
}
