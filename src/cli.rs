use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

use crate::world_core::config::{HeightSource, TerrainConfig};

pub const SEED_ENV_VAR: &str = "TERRAIN_FORGE_SEED";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub seed: Option<u32>,
    pub size: Option<(usize, usize)>,
    pub heightmap: Option<PathBuf>,
    pub export_png: Option<PathBuf>,
    pub stream_steps: Option<u32>,
}

impl CliArgs {
    pub fn from_env_args() -> Result<Self> {
        Self::from_iter(std::env::args_os().skip(1), std::env::var_os(SEED_ENV_VAR))
    }

    pub fn from_iter<I>(args: I, env_seed: Option<OsString>) -> Result<Self>
    where
        I: IntoIterator<Item = OsString>,
    {
        let mut parsed = Self::default();

        if let Some(value) = env_seed.as_deref() {
            let seed = parse_seed(value).with_context(|| format!("invalid {SEED_ENV_VAR}"))?;
            parsed.seed = Some(seed);
        }

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            let arg_str = arg.to_string_lossy();
            let flag = arg_str.as_ref();
            match flag {
                "--config" => parsed.config_path = Some(next_value(&mut iter, flag)?.into()),
                "--seed" => parsed.seed = Some(parse_seed(&next_value(&mut iter, flag)?)?),
                "--size" => parsed.size = Some(parse_size(&next_value(&mut iter, flag)?)?),
                "--heightmap" => parsed.heightmap = Some(next_value(&mut iter, flag)?.into()),
                "--export-png" => parsed.export_png = Some(next_value(&mut iter, flag)?.into()),
                "--stream" => {
                    let value = next_value(&mut iter, flag)?;
                    let steps = value
                        .to_string_lossy()
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| anyhow!("--stream expects a step count, got {value:?}"))?;
                    parsed.stream_steps = Some(steps);
                }
                other => log::warn!("ignoring unknown argument {other:?}"),
            }
        }

        Ok(parsed)
    }

    /// Writes the command-line overrides into a loaded config.
    pub fn apply(&self, config: &mut TerrainConfig) {
        if let Some(seed) = self.seed {
            config.world.seed = seed;
        }
        if let Some((width, depth)) = self.size {
            config.world.width = width;
            config.world.depth = depth;
        }
        if let Some(path) = &self.heightmap {
            config.source = HeightSource::Image { path: path.clone() };
        }
    }
}

fn next_value<I>(iter: &mut I, flag: &str) -> Result<OsString>
where
    I: Iterator<Item = OsString>,
{
    iter.next().ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn parse_seed(value: &OsStr) -> Result<u32> {
    let text = value.to_string_lossy();
    text.trim()
        .parse()
        .map_err(|_| anyhow!("seed must be an unsigned 32-bit integer, got {text:?}"))
}

fn parse_size(value: &OsStr) -> Result<(usize, usize)> {
    let text = value.to_string_lossy();
    let (width, depth) = text
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("--size expects <width>x<depth>, got {text:?}"))?;
    let width = width.parse::<usize>().with_context(|| format!("bad width in {text:?}"))?;
    let depth = depth.parse::<usize>().with_context(|| format!("bad depth in {text:?}"))?;
    Ok((width, depth))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<OsString> {
        list.iter().map(OsString::from).collect()
    }

    #[test]
    fn no_arguments_override_nothing() {
        let parsed = CliArgs::from_iter(Vec::<OsString>::new(), None).unwrap();
        assert_eq!(parsed, CliArgs::default());

        let mut config = TerrainConfig::default();
        parsed.apply(&mut config);
        assert_eq!(config.world.seed, TerrainConfig::default().world.seed);
    }

    #[test]
    fn flags_are_parsed() {
        let parsed = CliArgs::from_iter(
            args(&[
                "--config", "alt.json", "--seed", "7", "--size", "128x64", "--export-png",
                "out.png", "--stream", "12",
            ]),
            None,
        )
        .unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("alt.json")));
        assert_eq!(parsed.seed, Some(7));
        assert_eq!(parsed.size, Some((128, 64)));
        assert_eq!(parsed.export_png, Some(PathBuf::from("out.png")));
        assert_eq!(parsed.stream_steps, Some(12));
    }

    #[test]
    fn env_seed_applies_but_cli_wins() {
        let from_env = CliArgs::from_iter(Vec::<OsString>::new(), Some("99".into())).unwrap();
        assert_eq!(from_env.seed, Some(99));

        let both = CliArgs::from_iter(args(&["--seed", "3"]), Some("99".into())).unwrap();
        assert_eq!(both.seed, Some(3));
    }

    #[test]
    fn heightmap_switches_the_source() {
        let parsed = CliArgs::from_iter(args(&["--heightmap", "peaks.png"]), None).unwrap();
        let mut config = TerrainConfig::default();
        parsed.apply(&mut config);
        assert_eq!(
            config.source,
            HeightSource::Image {
                path: PathBuf::from("peaks.png")
            }
        );
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(CliArgs::from_iter(args(&["--seed"]), None).is_err());
        assert!(CliArgs::from_iter(args(&["--seed", "-4"]), None).is_err());
        assert!(CliArgs::from_iter(args(&["--size", "64"]), None).is_err());
        assert!(CliArgs::from_iter(args(&["--size", "ax8"]), None).is_err());
        assert!(CliArgs::from_iter(args(&["--stream", "many"]), None).is_err());
        assert!(CliArgs::from_iter(Vec::<OsString>::new(), Some("nope".into())).is_err());
    }
}
