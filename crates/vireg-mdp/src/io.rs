use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{Mdp, MdpSpec, ModelError};

fn file_error(path: &Path) -> impl FnOnce(io::Error) -> ModelError {
    let path = path.to_path_buf();
    move |source| ModelError::Io { path, source }
}

/// Parse a YAML model description without validating it.
pub fn load_yaml(path: impl AsRef<Path>) -> Result<MdpSpec, ModelError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(file_error(path))?;
    serde_yaml::from_str(&text).map_err(|source| ModelError::YamlFile {
        path: PathBuf::from(path),
        source,
    })
}

/// Read, validate, and compile a YAML model.
pub fn compile_yaml(path: impl AsRef<Path>) -> Result<Mdp, ModelError> {
    let path = path.as_ref();
    let mdp = load_yaml(path)?.compile()?;
    debug!(
        path = %path.display(),
        states = mdp.num_states(),
        actions = mdp.num_actions(),
        "compiled model file"
    );
    Ok(mdp)
}

/// Write a model description to `path`, replacing any existing file.
pub fn save_yaml(path: impl AsRef<Path>, spec: &MdpSpec) -> Result<(), ModelError> {
    let path = path.as_ref();
    let text = serde_yaml::to_string(spec)?;
    fs::write(path, text).map_err(file_error(path))
}

/// Write `mdp` to `path` with generated `s{i}`/`a{i}` ids; see [`MdpSpec::from_mdp`].
pub fn export_yaml(path: impl AsRef<Path>, mdp: &Mdp) -> Result<(), ModelError> {
    save_yaml(path, &MdpSpec::from_mdp(mdp))
}
