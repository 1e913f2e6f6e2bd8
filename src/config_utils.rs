use std::fs;
use std::path::Path;
use std::path::PathBuf;

use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::apportion::NoPathPolicy;
use super::error::RidershipError;


/// Where the inputs and outputs of a run are, and how to run it.
#[derive(PartialEq, Debug, Clone)]
pub struct RidershipConfig {
    pub streets_csv: PathBuf,
    pub route_segments_csv: PathBuf,
    pub ridership_csv: PathBuf,
    pub output_csv: Option<PathBuf>,
    pub no_path_policy: NoPathPolicy,
    pub parallel: bool,
}

impl RidershipConfig {
    pub fn from_path(config_path: &Path) -> Result<RidershipConfig, RidershipError> {
        let file_contents = fs::read_to_string(config_path)?;
        let docs = YamlLoader::load_from_str(&file_contents).map_err(|err|
            RidershipError::Config(format!("{:?} is not valid yaml: {}", config_path, err)))?;
        let yaml_cfg = match docs.first() {
            Some(doc) => doc,
            None => return Err(RidershipError::Config(format!("{:?} is empty", config_path))),
        };
        // relative paths are relative to the config file
        let base_dir = match config_path.parent() {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::new(),
        };
        RidershipConfig::from_yaml(yaml_cfg, &base_dir)
    }

    pub fn from_yaml(yaml_cfg: &Yaml, base_dir: &Path) -> Result<RidershipConfig, RidershipError> {
        let get_path = |key: &str| -> Result<Option<PathBuf>, RidershipError> {
            match &yaml_cfg[key] {
                Yaml::String(path_str) => Ok(Some(str_to_absolute_path(path_str, base_dir))),
                Yaml::BadValue | Yaml::Null => Ok(None),
                _ => Err(RidershipError::Config(format!("{} must be a path", key))),
            }
        };
        let require_path = |key: &str| -> Result<PathBuf, RidershipError> {
            match get_path(key)? {
                Some(path) => Ok(path),
                None => Err(RidershipError::Config(format!("no {} given", key))),
            }
        };

        let no_path_policy = match &yaml_cfg["no_path_policy"] {
            Yaml::BadValue | Yaml::Null => NoPathPolicy::default(),
            Yaml::String(policy) if policy == "reuse_previous" => NoPathPolicy::ReusePrevious,
            Yaml::String(policy) if policy == "skip_path" => NoPathPolicy::SkipPath,
            other => return Err(RidershipError::Config(
                format!("unknown no_path_policy {:?}", other))),
        };
        let parallel = match &yaml_cfg["parallel"] {
            Yaml::BadValue | Yaml::Null => false,
            Yaml::Boolean(parallel) => *parallel,
            _ => return Err(RidershipError::Config(String::from("parallel must be true or false"))),
        };

        Ok(RidershipConfig {
            streets_csv: require_path("streets_csv")?,
            route_segments_csv: require_path("route_segments_csv")?,
            ridership_csv: require_path("ridership_csv")?,
            output_csv: get_path("output_csv")?,
            no_path_policy,
            parallel,
        })
    }
}

pub fn str_to_absolute_path(path_str: &str, default_base_dir: &Path) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        return path;
    } else {
        return [default_base_dir, Path::new(&path)].iter().collect();
    }
}
