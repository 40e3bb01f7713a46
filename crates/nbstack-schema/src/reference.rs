//! Lexical validation of container image references (`[host[:port]/]path[:tag][@digest]`).

/// Why an image reference was rejected.
pub type RefIssue = &'static str;

pub fn validate_image_reference(reference: &str) -> Result<(), RefIssue> {
    if reference.is_empty() {
        return Err("reference is empty");
    }
    if reference.chars().any(char::is_whitespace) {
        return Err("reference contains whitespace");
    }

    let (name_and_tag, digest) = match reference.split_once('@') {
        Some((rest, digest)) => (rest, Some(digest)),
        None => (reference, None),
    };
    if let Some(digest) = digest {
        validate_digest(digest)?;
    }

    let last_slash = name_and_tag.rfind('/').map_or(0, |i| i + 1);
    let (name, tag) = match name_and_tag[last_slash..].rfind(':') {
        Some(i) => {
            let split = last_slash + i;
            (&name_and_tag[..split], Some(&name_and_tag[split + 1..]))
        }
        None => (name_and_tag, None),
    };
    if let Some(tag) = tag {
        validate_tag(tag)?;
    }

    let mut components: Vec<&str> = name.split('/').collect();
    if components.len() > 1 && looks_like_registry(components[0]) {
        validate_registry(components.remove(0))?;
    }
    if components.is_empty() {
        return Err("repository path is empty");
    }
    for component in components {
        validate_path_component(component)?;
    }
    Ok(())
}

/// True when the reference pins content with `@algo:hex`.
pub fn has_digest(reference: &str) -> bool {
    reference.contains('@')
}

fn looks_like_registry(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

fn validate_registry(host: &str) -> Result<(), RefIssue> {
    let (hostname, port) = match host.split_once(':') {
        Some((h, p)) => (h, Some(p)),
        None => (host, None),
    };
    if hostname.is_empty()
        || !hostname
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err("registry host is malformed");
    }
    if let Some(port) = port {
        if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
            return Err("registry port must be numeric");
        }
    }
    Ok(())
}

fn validate_path_component(component: &str) -> Result<(), RefIssue> {
    let is_alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if component.is_empty() {
        return Err("repository path has an empty component");
    }
    if !component
        .chars()
        .all(|c| is_alnum(c) || matches!(c, '.' | '_' | '-'))
    {
        return Err("repository path must be lowercase alphanumerics and separators");
    }
    let first = component.chars().next().is_some_and(is_alnum);
    let last = component.chars().last().is_some_and(is_alnum);
    if !first || !last {
        return Err("repository path component must start and end with an alphanumeric");
    }
    Ok(())
}

fn validate_tag(tag: &str) -> Result<(), RefIssue> {
    if tag.is_empty() || tag.len() > 128 {
        return Err("tag must be 1 to 128 characters");
    }
    let mut chars = tag.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    if !first_ok
        || !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err("tag contains invalid characters");
    }
    Ok(())
}

fn validate_digest(digest: &str) -> Result<(), RefIssue> {
    let Some((algo, hex)) = digest.split_once(':') else {
        return Err("digest must be '<algorithm>:<hex>'");
    };
    if algo.is_empty()
        || !algo
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+._-".contains(c))
    {
        return Err("digest algorithm is malformed");
    }
    if hex.len() < 32 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("digest must be at least 32 hex characters");
    }
    Ok(())
}
