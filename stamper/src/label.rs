//! Scene labels derived from the file path the scene switcher passes in.

/// Turns a source file path into the label written next to the timestamp.
///
/// Takes the final path component (splitting on both `/` and `\`, since the scene switcher
/// may hand over Windows paths), then removes every `@` and every `.png`. Nothing else is
/// touched.
pub fn sanitize_label(source_file: &str) -> String {
    let base = source_file.rsplit(['/', '\\']).next().unwrap_or(source_file);
    base.replace('@', "").replace(".png", "")
}

/// The line appended to the description for one scene change.
pub fn description_line(elapsed: &str, label: &str) -> String {
    format!("{elapsed} {label}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_directory_at_sign_and_extension() {
        assert_eq!(sanitize_label("/home/me/scenes/@scene_intro.png"), "scene_intro");
        assert_eq!(sanitize_label(r"C:\OBS\scenes\@scene_intro.png"), "scene_intro");
        assert_eq!(sanitize_label("@scene_intro.png"), "scene_intro");
    }

    #[test]
    fn leaves_other_characters_alone() {
        assert_eq!(sanitize_label("dir/Boss Fight #2!.jpg"), "Boss Fight #2!.jpg");
        assert_eq!(sanitize_label("a@b@c.png.png"), "abc");
        assert_eq!(sanitize_label("dir/"), "");
    }

    #[test]
    fn line_is_elapsed_then_label() {
        assert_eq!(description_line("01:23:45", "scene_intro"), "01:23:45 scene_intro");
    }
}
