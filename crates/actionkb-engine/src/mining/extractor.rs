//! Page-object source extraction
//!
//! Pulls the declared class and its public method signatures out of Java and
//! Kotlin sources. This is pattern matching over text, not parsing; it only
//! needs to be right for the conventional page-object layout.

use lazy_static::lazy_static;
use regex::Regex;

// Declarations may follow annotations on the same line, e.g. `@Override public void ...`
lazy_static! {
    static ref BLOCK_COMMENT: Regex = Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern");
    static ref LINE_COMMENT: Regex = Regex::new(r"//[^\n]*").expect("line comment pattern");
    static ref CLASS_DECL: Regex = Regex::new(
        r"(?m)^\s*(?:@[\w.]+(?:\([^)]*\))?\s+)*(?:(?:public|protected|private|abstract|final|open|internal|sealed|data)\s+)*(?:class|object)\s+([A-Za-z_]\w*)"
    )
    .expect("class pattern");
    static ref JAVA_METHOD: Regex = Regex::new(
        r"(?m)^\s*(?:@[\w.]+(?:\([^)]*\))?\s+)*public\s+(?:(?:static|final|synchronized|abstract|default|native)\s+)*(?:<[^>]*>\s+)?([\w.\[\]]+(?:<[\w.,?\s<>\[\]]*>)?(?:\[\])*)\s+([A-Za-z_]\w*)\s*\(([^)]*)\)"
    )
    .expect("java method pattern");
    static ref KOTLIN_METHOD: Regex = Regex::new(
        r"(?m)^\s*(?:@[\w.]+(?:\([^)]*\))?\s+)*(?:(?:public|override|open|suspend|final|inline)\s+)*fun\s+(?:<[^>]*>\s+)?([A-Za-z_]\w*)\s*\(([^)]*)\)(?:\s*:\s*([\w.?]+(?:<[\w.,?\s<>]*>)?\??))?"
    )
    .expect("kotlin method pattern");
}

/// Source language, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Java,
    Kotlin,
}

impl SourceLanguage {
    /// Language for a file extension; anything that is not Kotlin is read as Java
    pub fn from_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case("kt") || extension.eq_ignore_ascii_case("kts") {
            Self::Kotlin
        } else {
            Self::Java
        }
    }
}

/// Methods every object has, never treated as actions
const OBJECT_METHODS: &[&str] = &["equals", "hashCode", "toString", "clone", "finalize", "main"];
/// Accessor prefixes, excluded when followed by an upper-case letter
const ACCESSOR_PREFIXES: &[&str] = &["get", "set", "is", "has"];

/// One public method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: String,
    pub return_type: String,
    /// Parameter declarations in source order
    pub parameters: Vec<String>,
}

/// Declared class and its action methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedClass {
    pub class_name: String,
    pub methods: Vec<MethodSignature>,
}

/// Whether `name` is an accessor or a standard object method
pub fn is_excluded_method(name: &str) -> bool {
    if OBJECT_METHODS.contains(&name) {
        return true;
    }
    ACCESSOR_PREFIXES.iter().any(|prefix| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.chars().next())
            .is_some_and(|c| c.is_uppercase())
    })
}

/// Split a parameter list on top-level commas
fn split_parameters(list: &str) -> Vec<String> {
    let mut parameters = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();

    for c in list.chars() {
        match c {
            '<' | '(' => depth += 1,
            '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parameters.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parameters.push(current);

    parameters
        .into_iter()
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| !p.is_empty())
        .collect()
}

fn strip_comments(source: &str) -> String {
    let without_blocks = BLOCK_COMMENT.replace_all(source, "");
    LINE_COMMENT.replace_all(&without_blocks, "").into_owned()
}

/// Extract the first declared class and its public action methods
///
/// Returns `None` when the source declares no class.
pub fn extract(source: &str, language: SourceLanguage) -> Option<ExtractedClass> {
    let source = strip_comments(source);
    let class_name = CLASS_DECL.captures(&source)?.get(1)?.as_str().to_string();

    let signatures: Vec<MethodSignature> = match language {
        SourceLanguage::Java => JAVA_METHOD
            .captures_iter(&source)
            .map(|caps| MethodSignature {
                name: caps[2].to_string(),
                return_type: caps[1].to_string(),
                parameters: split_parameters(&caps[3]),
            })
            .collect(),
        SourceLanguage::Kotlin => KOTLIN_METHOD
            .captures_iter(&source)
            .map(|caps| MethodSignature {
                name: caps[1].to_string(),
                return_type: caps.get(3).map_or("Unit", |m| m.as_str()).to_string(),
                parameters: split_parameters(&caps[2]),
            })
            .collect(),
    };

    let methods = signatures
        .into_iter()
        .filter(|m| !is_excluded_method(&m.name))
        .collect();

    Some(ExtractedClass { class_name, methods })
}
