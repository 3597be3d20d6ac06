use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a space sandwiched between two CJK characters. Applied
/// iteratively in `strip_cjk_spacing` since consecutive matches overlap
/// (spec.md S4.4.3 "Chinese-space cleanup").
static CJK_SPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\u{4E00}-\u{9FFF}\u{3400}-\u{4DBF}])\s+([\u{4E00}-\u{9FFF}\u{3400}-\u{4DBF}])").unwrap()
});

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// Removes spaces inserted between CJK characters by upstream chunking.
/// Idempotent: running it twice yields the same string, since each pass
/// removes every CJK-CJK space until none remain.
pub fn strip_cjk_spacing(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = CJK_SPACE.replace_all(&current, "$1$2").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// True when either side of a chunk boundary is CJK, used by the smart-join
/// rule to decide whether a separating space belongs between two chunks.
pub fn touches_cjk(left: &str, right: &str) -> bool {
    left.chars().last().map(is_cjk).unwrap_or(false) || right.chars().next().map(is_cjk).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_space_between_cjk_characters() {
        assert_eq!(strip_cjk_spacing("你 好 世 界"), "你好世界");
    }

    #[test]
    fn leaves_latin_spacing_untouched() {
        assert_eq!(strip_cjk_spacing("hello world"), "hello world");
    }

    #[test]
    fn is_idempotent() {
        let once = strip_cjk_spacing("你 好 hello 世 界");
        let twice = strip_cjk_spacing(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn mixed_script_keeps_latin_space_but_drops_cjk_space() {
        assert_eq!(strip_cjk_spacing("你好 hello 世界"), "你好 hello 世界");
    }
}
