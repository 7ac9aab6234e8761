// Directory deploys.
//
// A deploy directory `<name>/` holds `<name>.config` (JSON object of post or
// page fields), `<name>.md` (the markdown body) and optionally `images/`.
// Deploying uploads the referenced images, points the markdown and the
// feature image at their public URLs, renders the body to HTML, creates or
// updates the resource, and finally writes the rewritten markdown and the
// resolved id back into the directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use pulldown_cmark::{html, Options, Parser};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{GhostError, Result};
use crate::resource::{Fields, ResourceKind, SearchBy};
use crate::transport::Transport;

const IMAGE_DIR: &str = "images";
const FEATURE_IMAGE: &str = "feature_image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeployMode {
    #[default]
    Create,
    /// Update the resource whose id is stored in the config file.
    Update,
}

/// Paths making up a deploy directory, checked to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployDir {
    pub root: PathBuf,
    pub base_name: String,
    pub config_file: PathBuf,
    pub md_file: PathBuf,
    /// Present only when an `images/` directory exists.
    pub image_dir: Option<PathBuf>,
}

impl DeployDir {
    /// Resolve `dir` and check the config and markdown files exist.
    ///
    /// The name comes from the path as given, made absolute and with `.`
    /// and `..` folded away; symlinks are not followed.
    pub fn resolve(dir: &Path) -> Result<Self> {
        let root = normalize(&std::path::absolute(dir).map_err(|e| GhostError::io(dir, e))?);
        if !root.is_dir() {
            return Err(GhostError::Deploy(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let base_name = root
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                GhostError::Deploy(format!("cannot derive a name from {}", root.display()))
            })?
            .to_string();

        let config_file = root.join(format!("{base_name}.config"));
        info!(path = %config_file.display(), "expecting config file");
        require_file(&config_file)?;

        let md_file = root.join(format!("{base_name}.md"));
        info!(path = %md_file.display(), "expecting markdown file");
        require_file(&md_file)?;

        let image_dir = root.join(IMAGE_DIR);
        let image_dir = if image_dir.is_dir() {
            info!("found image directory");
            Some(image_dir)
        } else {
            info!("images folder not found; image upload will be skipped");
            None
        };

        Ok(DeployDir {
            root,
            base_name,
            config_file,
            md_file,
            image_dir,
        })
    }

    /// File names in `images/`, sorted.
    pub fn images(&self) -> Result<Vec<String>> {
        let Some(image_dir) = &self.image_dir else {
            return Ok(Vec::new());
        };
        let entries = fs::read_dir(image_dir).map_err(|e| GhostError::io(image_dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| GhostError::io(image_dir, e))?;
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!(?name, "skipping image with a non UTF-8 name"),
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Lexically drop `.` and resolve `..` against the preceding component.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(GhostError::Deploy(format!(
            "{} does not exist",
            path.display()
        )));
    }
    Ok(())
}

/// Render markdown to HTML.
pub fn render_markdown(text: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES | Options::ENABLE_STRIKETHROUGH;
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(text, options));
    out
}

fn read_config(path: &Path) -> Result<Fields> {
    let raw = fs::read_to_string(path).map_err(|e| GhostError::io(path, e))?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| GhostError::InvalidJson {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Object(fields) => Ok(fields),
        _ => Err(GhostError::Deploy(format!(
            "{} must contain a JSON object",
            path.display()
        ))),
    }
}

/// Write fields as pretty-printed JSON with sorted keys.
fn write_config(path: &Path, fields: Fields) -> Result<()> {
    let sorted: BTreeMap<String, Value> = fields.into_iter().collect();
    let mut out = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    sorted
        .serialize(&mut ser)
        .map_err(|source| GhostError::InvalidJson {
            path: path.to_path_buf(),
            source,
        })?;
    out.push(b'\n');
    fs::write(path, out).map_err(|e| GhostError::io(path, e))
}

impl<T: Transport> ApiClient<T> {
    /// Create or update a post or page from a deploy directory and return
    /// the server response.
    ///
    /// Missing files, an unreadable config, or (when updating) a config
    /// without an `id` fail before any request is made.
    pub fn deploy(&self, kind: ResourceKind, dir: &Path, mode: DeployMode) -> Result<Value> {
        info!(dir = %dir.display(), "using directory as {} directory", kind.singular());

        let layout = DeployDir::resolve(dir)?;
        let mut config = read_config(&layout.config_file)?;
        let mut text =
            fs::read_to_string(&layout.md_file).map_err(|e| GhostError::io(&layout.md_file, e))?;

        let update_id = match mode {
            DeployMode::Create => None,
            DeployMode::Update => Some(
                config
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        GhostError::Deploy(format!(
                            "{} has no id to update",
                            layout.config_file.display()
                        ))
                    })?,
            ),
        };

        self.publish_images(kind, &layout, &mut text, &mut config)?;

        config.insert("html".to_string(), Value::String(render_markdown(&text)));

        let response = match &update_id {
            None => self.create(kind, config.clone())?,
            Some(id) => self.update(kind, config.clone(), id, SearchBy::Id)?,
        };

        let id = kind
            .first_record(&response)
            .and_then(|record| record.get("id"))
            .cloned()
            .ok_or_else(|| {
                GhostError::UnexpectedResponse(format!("{} response has no id", kind.singular()))
            })?;

        fs::write(&layout.md_file, &text).map_err(|e| GhostError::io(&layout.md_file, e))?;
        config.remove("html");
        config.insert("id".to_string(), id);
        write_config(&layout.config_file, config)?;

        info!(
            "{} successfully {}",
            kind.singular(),
            if update_id.is_some() { "updated" } else { "created" }
        );
        Ok(response)
    }

    /// Upload every image the markdown or the feature image refers to, and
    /// swap the local `images/<file>` paths for the returned URLs.
    fn publish_images(
        &self,
        kind: ResourceKind,
        layout: &DeployDir,
        text: &mut String,
        config: &mut Fields,
    ) -> Result<()> {
        let Some(image_dir) = &layout.image_dir else {
            return Ok(());
        };
        let images = layout.images()?;
        if images.is_empty() {
            warn!("images folder found but no images present; skipping image upload");
            return Ok(());
        }

        for image in images {
            let local_path = format!("{IMAGE_DIR}/{image}");
            let in_text = text.contains(&local_path);
            let in_config =
                config.get(FEATURE_IMAGE).and_then(Value::as_str) == Some(local_path.as_str());

            if !in_text && !in_config {
                warn!(
                    path = %local_path,
                    "image in directory but not referenced in {}",
                    kind.singular()
                );
                continue;
            }

            let reference = format!("{IMAGE_DIR}/{}/{image}", layout.base_name);
            let uploaded = self.upload_image(&image_dir.join(&image), &reference)?;
            info!(%image, "image uploaded");

            if in_text {
                *text = text.replace(&local_path, &uploaded.url);
            }
            if in_config {
                config.insert(
                    FEATURE_IMAGE.to_string(),
                    Value::String(uploaded.url.clone()),
                );
            }
        }
        Ok(())
    }
}
