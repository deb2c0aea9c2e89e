use std::path::Path;

use crate::api::errors::ApiError;

/// Lower-cased extension of `filename` if it is one of `allowed_extensions`
/// and `content_type` is a MIME type that fits it.
pub(crate) fn validate_media_upload(
    filename: &str,
    content_type: &str,
    allowed_extensions: &[String],
) -> Result<String, ApiError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(ApiError::BadRequest(format!("File extension '{extension}' is not allowed")));
    }

    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    if mime_allowed_for_extension(&mime, &extension) {
        Ok(extension)
    } else {
        Err(ApiError::BadRequest(format!(
            "MIME type '{mime}' does not match extension '.{extension}'"
        )))
    }
}

fn mime_allowed_for_extension(mime: &str, extension: &str) -> bool {
    match extension {
        "jpg" | "jpeg" => matches!(mime, "image/jpeg" | "image/jpg"),
        "png" => mime == "image/png",
        "webp" => mime == "image/webp",
        "gif" => mime == "image/gif",
        "mp3" => matches!(mime, "audio/mpeg" | "audio/mp3"),
        "wav" => matches!(mime, "audio/wav" | "audio/x-wav" | "audio/wave"),
        "ogg" => matches!(mime, "audio/ogg" | "application/ogg"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        ["png", "jpg", "mp3", "ogg"].iter().map(|ext| ext.to_string()).collect()
    }

    #[test]
    fn accepts_matching_image_and_audio() {
        assert_eq!(validate_media_upload("Cat.PNG", "image/png", &allowed()).unwrap(), "png");
        assert_eq!(
            validate_media_upload("clip.ogg", "audio/ogg; codecs=vorbis", &allowed()).unwrap(),
            "ogg"
        );
    }

    #[test]
    fn rejects_mismatch_and_unknown_extensions() {
        assert!(validate_media_upload("clip.mp3", "image/png", &allowed()).is_err());
        assert!(validate_media_upload("script.exe", "application/octet-stream", &allowed()).is_err());
        assert!(validate_media_upload("noext", "image/png", &allowed()).is_err());
        assert!(validate_media_upload("song.wav", "audio/wav", &allowed()).is_err());
    }
}
