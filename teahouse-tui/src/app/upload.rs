use std::path::{Path, PathBuf};

use chrono::Utc;
use ratatui::style::Style;
use tui_textarea::TextArea;

use teahouse_types::{Bucket, NewPost, Post};

use crate::api::{ApiError, ApiResult, Repository};
use crate::app::gate::Session;

/// A local image file ready for upload
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub content_type: &'static str,
}

pub fn content_type_for(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(input: &str) -> PathBuf {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(input)
}

/// Read and check an image before anything touches the network
pub async fn read_image(path: &Path) -> ApiResult<ImageFile> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let content_type = content_type_for(&extension).ok_or_else(|| {
        ApiError::InvalidRecord(format!("{} is not a supported image", path.display()))
    })?;

    let bytes = tokio::fs::read(path).await?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidRecord(format!(
            "{} is empty",
            path.display()
        )));
    }

    Ok(ImageFile {
        bytes,
        extension,
        content_type,
    })
}

pub(crate) fn text_area(lines: Vec<String>) -> TextArea<'static> {
    let mut textarea = if lines.is_empty() {
        TextArea::default()
    } else {
        TextArea::new(lines)
    };
    textarea.set_cursor_line_style(Style::default());
    textarea.set_hard_tab_indent(true);
    textarea
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerField {
    Path,
    Caption,
}

/// New post form: image path and caption
pub struct PostComposer {
    pub path: String,
    pub caption: TextArea<'static>,
    pub field: ComposerField,
    pub busy: bool,
    pub error: Option<String>,
}

impl Default for PostComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PostComposer {
    pub fn new() -> Self {
        Self {
            path: String::new(),
            caption: text_area(Vec::new()),
            field: ComposerField::Path,
            busy: false,
            error: None,
        }
    }

    pub fn caption_text(&self) -> String {
        self.caption.lines().join("\n")
    }

    pub fn toggle_field(&mut self) {
        self.field = match self.field {
            ComposerField::Path => ComposerField::Caption,
            ComposerField::Caption => ComposerField::Path,
        };
    }

    /// Upload the image, then insert the post. An insert failure leaves the
    /// uploaded object behind.
    pub async fn submit(&mut self, repo: &Repository, session: &Session) -> ApiResult<Post> {
        let Some(profile) = session.profile.as_ref() else {
            return Err(ApiError::Unauthorized(
                "complete your profile before posting".to_string(),
            ));
        };
        if self.path.trim().is_empty() {
            return Err(ApiError::InvalidRecord("choose an image file".to_string()));
        }

        let image = read_image(&expand_path(&self.path)).await?;
        let caption = self.caption_text();
        let caption = if caption.trim().is_empty() {
            None
        } else {
            Some(caption)
        };

        self.busy = true;
        let result = async {
            let name = format!("{}.{}", Utc::now().timestamp_millis(), image.extension);
            let image_url = repo
                .upload_image(Bucket::PostImages, &name, image.bytes, image.content_type)
                .await?;

            let post = NewPost {
                user_id: profile.id,
                author_name: profile.full_name.clone(),
                image_url,
                caption,
            };
            repo.create_post(&post).await.map_err(|e| {
                log::warn!("Post insert failed after uploading {}: {}", name, e);
                e
            })
        }
        .await;
        self.busy = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(content_type_for("jpg"), Some("image/jpeg"));
        assert_eq!(content_type_for("png"), Some("image/png"));
        assert_eq!(content_type_for("txt"), None);
    }

    #[tokio::test]
    async fn test_read_image_rejects_missing_and_unknown_files() {
        let dir = tempfile::TempDir::new().unwrap();

        let missing = dir.path().join("nope.jpg");
        assert!(matches!(read_image(&missing).await, Err(ApiError::Io(_))));

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hello").unwrap();
        assert!(matches!(
            read_image(&text).await,
            Err(ApiError::InvalidRecord(_))
        ));

        let empty = dir.path().join("empty.png");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(
            read_image(&empty).await,
            Err(ApiError::InvalidRecord(_))
        ));

        let photo = dir.path().join("Photo.JPG");
        std::fs::write(&photo, [0xff, 0xd8, 0xff]).unwrap();
        let image = read_image(&photo).await.unwrap();
        assert_eq!(image.extension, "jpg");
        assert_eq!(image.content_type, "image/jpeg");
    }
}
