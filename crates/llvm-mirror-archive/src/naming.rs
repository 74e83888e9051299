/// Split a base name at its last `.` into stem and extension (dot included).
///
/// Only the final extension is split off: `llvm-config.py` gives `("llvm-config", ".py")`,
/// and a name without a dot has an empty extension.
pub fn split_extension(base_name: &str) -> (&str, &str) {
    match base_name.rfind('.') {
        Some(at) => base_name.split_at(at),
        None => (base_name, ""),
    }
}

/// Republished name for an entry: `{stem}-{version_tag}{extension}`.
///
/// An empty tag yields the base name unchanged. Callers rely on base names being unique
/// under the filtered prefix of one archive; distinct names within one asset map to
/// distinct outputs.
pub fn output_name(base_name: &str, version_tag: &str) -> String {
    let (stem, extension) = split_extension(base_name);
    if version_tag.is_empty() {
        return format!("{stem}{extension}");
    }
    format!("{stem}-{version_tag}{extension}")
}
