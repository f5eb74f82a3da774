const FENCE: &str = "```";

/// Extracts shader code from a Markdown-style reply.
///
/// When the text contains a code fence, the body of the first fenced block is
/// returned with its language tag removed. An unterminated block runs to the
/// end of the text. Text without fences is returned trimmed.
pub fn strip_code_fences(text: &str) -> String {
    let Some(open) = text.find(FENCE) else {
        return text.trim().to_string();
    };
    let after_open = &text[open + FENCE.len()..];

    let body = match after_open.split_once('\n') {
        Some((info, rest)) if is_info_string(info) => rest,
        _ => after_open,
    };
    let content = match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    };
    content.trim().to_string()
}

/// True for the language tag that may follow an opening fence (`glsl`,
/// `c++`, empty).
fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_fence() {
        let text = "```glsl\nvoid main() {\n    gl_FragColor = vec4(1.0);\n}\n```";
        assert_eq!(
            strip_code_fences(text),
            "void main() {\n    gl_FragColor = vec4(1.0);\n}"
        );
    }

    #[test]
    fn strips_untagged_fence_with_surrounding_prose() {
        let text = "Here is your shader:\n```\nvoid main() {}\n```\nEnjoy!";
        assert_eq!(strip_code_fences(text), "void main() {}");
    }

    #[test]
    fn first_code_line_after_a_bare_fence_is_kept() {
        assert_eq!(strip_code_fences("```\nmain\n```"), "main");
        assert_eq!(
            strip_code_fences("```\nprecision\nvoid main() {}\n```"),
            "precision\nvoid main() {}"
        );
    }

    #[test]
    fn plain_text_is_trimmed() {
        assert_eq!(strip_code_fences("  \nvoid main() {}\n\n"), "void main() {}");
    }

    #[test]
    fn only_the_first_block_is_used() {
        let text = "```glsl\nfirst\n```\nand\n```glsl\nsecond\n```";
        assert_eq!(strip_code_fences(text), "first");
    }

    #[test]
    fn unterminated_block_runs_to_end() {
        assert_eq!(strip_code_fences("```glsl\nvoid main() {}\n"), "void main() {}");
    }

    #[test]
    fn single_line_fence_keeps_code() {
        assert_eq!(strip_code_fences("```void main() {}```"), "void main() {}");
    }
}
