use std::path::PathBuf;

use tutor::schema::Resource;

use crate::models::Upload;

pub fn parse_upload(raw: &str) -> Result<Upload, String> {
    let (slug, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <resource>=<path>, got {raw:?}"))?;

    let resource = Resource::from_slug(slug.trim()).ok_or_else(|| {
        let known: Vec<&str> = Resource::ALL.iter().map(|r| r.slug()).collect();
        format!("unknown resource {slug:?}, expected one of {}", known.join(", "))
    })?;

    let path = path.trim();
    if path.is_empty() {
        return Err(format!("missing file path for {slug}"));
    }

    Ok(Upload {
        resource,
        path: PathBuf::from(path),
    })
}
