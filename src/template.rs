use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::QuestionConfig;
use crate::error::{GradingError, GradingResult};

/// Marker replaced by the learner's fragment
pub const PLACEHOLDER: &str = "{{CODE}}";

/// Surrounding program text with a single placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaffold {
    lines: Vec<String>,
    /// Expected signature of the method the learner fills in, if the store knows it
    signature: Option<String>,
}

impl Scaffold {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn placeholder_count(&self) -> usize {
        self.lines
            .iter()
            .map(|line| line.matches(PLACEHOLDER).count())
            .sum()
    }
}

impl<S: Into<String>> FromIterator<S> for Scaffold {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A scaffold with its placeholder replaced by a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedProgram {
    source: String,
    fragment_span: Range<usize>,
}

impl ComposedProgram {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The fragment exactly as it was substituted
    pub fn fragment(&self) -> &str {
        &self.source[self.fragment_span.clone()]
    }

    pub fn fragment_span(&self) -> Range<usize> {
        self.fragment_span.clone()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub description: String,
}

/// Substitutes `fragment` for the scaffold's placeholder.
///
/// The fragment is inserted verbatim: no re-indentation and no syntax check.
/// Fails with [`GradingError::MalformedScaffold`] unless the placeholder
/// appears exactly once.
pub fn compose(scaffold: &Scaffold, fragment: &str) -> GradingResult<ComposedProgram> {
    let occurrences = scaffold.placeholder_count();
    if occurrences != 1 {
        log::error!("Refusing to compose scaffold with {occurrences} placeholders");
        return Err(GradingError::MalformedScaffold { occurrences });
    }

    let text = scaffold.text();
    let start = text
        .find(PLACEHOLDER)
        .ok_or(GradingError::MalformedScaffold { occurrences: 0 })?;

    let mut source = String::with_capacity(text.len() + fragment.len());
    source.push_str(&text[..start]);
    source.push_str(fragment);
    source.push_str(&text[start + PLACEHOLDER.len()..]);

    Ok(ComposedProgram {
        source,
        fragment_span: start..start + fragment.len(),
    })
}

/// Read-only source of scaffolds and test cases
pub trait TemplateStore: Send + Sync {
    fn get_scaffold(&self, question_id: u32) -> GradingResult<Arc<Scaffold>>;

    fn get_test_cases(&self, question_id: u32) -> GradingResult<Vec<TestCase>>;
}

struct StoredQuestion {
    scaffold: Arc<Scaffold>,
    test_cases: Vec<TestCase>,
}

/// Template store backed by the question list of the configuration file
#[derive(Default)]
pub struct InMemoryTemplateStore {
    questions: HashMap<u32, StoredQuestion>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question_id: u32, scaffold: Scaffold, test_cases: Vec<TestCase>) {
        if scaffold.placeholder_count() != 1 {
            log::warn!(
                "Question {question_id} has {} placeholders; grading it will fail",
                scaffold.placeholder_count()
            );
        }
        self.questions.insert(
            question_id,
            StoredQuestion {
                scaffold: Arc::new(scaffold),
                test_cases,
            },
        );
    }

    pub fn from_questions(questions: Vec<QuestionConfig>) -> Self {
        let mut store = Self::new();
        for question in questions {
            log::debug!(
                "Loading question {} ({}) with {} test cases",
                question.id,
                question.name,
                question.test_cases.len()
            );
            let mut scaffold = Scaffold::new(question.scaffold);
            if let Some(signature) = question.signature {
                scaffold = scaffold.with_signature(signature);
            }
            store.insert(question.id, scaffold, question.test_cases);
        }
        store
    }

    fn question(&self, question_id: u32) -> GradingResult<&StoredQuestion> {
        self.questions
            .get(&question_id)
            .ok_or(GradingError::QuestionNotFound { question_id })
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn get_scaffold(&self, question_id: u32) -> GradingResult<Arc<Scaffold>> {
        Ok(Arc::clone(&self.question(question_id)?.scaffold))
    }

    fn get_test_cases(&self, question_id: u32) -> GradingResult<Vec<TestCase>> {
        Ok(self.question(question_id)?.test_cases.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method_scaffold() -> Scaffold {
        [
            "public int f(String s) throws IOException {",
            "{{CODE}}",
            "}",
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_compose_places_fragment_inside_method() {
        let program = compose(&method_scaffold(), "return 2;").unwrap();

        assert!(program.source().lines().any(|line| line == "return 2;"));
        assert!(!program.source().contains(PLACEHOLDER));
        assert_eq!(
            program.source(),
            "public int f(String s) throws IOException {\nreturn 2;\n}"
        );
    }

    #[test]
    fn test_fragment_is_recoverable_verbatim() {
        let scaffold: Scaffold = ["class A {", "  void g() { {{CODE}} }", "}"]
            .into_iter()
            .collect();
        for fragment in ["", "x++;", "  if (a) {\n    b();\n  }\n", "{{ odd }}"] {
            let program = compose(&scaffold, fragment).unwrap();
            assert_eq!(program.fragment(), fragment);
            assert_eq!(program.fragment_span().start, "class A {\n  void g() { ".len());
        }
    }

    #[test]
    fn test_compose_rejects_missing_placeholder() {
        let scaffold: Scaffold = ["class A {}"].into_iter().collect();
        let err = compose(&scaffold, "x").unwrap_err();
        assert!(matches!(err, GradingError::MalformedScaffold { occurrences: 0 }));
    }

    #[test]
    fn test_compose_rejects_duplicate_placeholder() {
        let scaffold: Scaffold = ["{{CODE}}", "{{CODE}}"].into_iter().collect();
        let err = compose(&scaffold, "x").unwrap_err();
        assert!(matches!(err, GradingError::MalformedScaffold { occurrences: 2 }));
    }

    #[test]
    fn test_store_lookup() {
        let mut store = InMemoryTemplateStore::new();
        store.insert(
            7,
            method_scaffold(),
            vec![TestCase {
                input: "a".into(),
                expected_output: "2".into(),
                description: "constant".into(),
            }],
        );

        assert_eq!(*store.get_scaffold(7).unwrap(), method_scaffold());
        assert_eq!(store.get_test_cases(7).unwrap().len(), 1);
        assert!(matches!(
            store.get_scaffold(8),
            Err(GradingError::QuestionNotFound { question_id: 8 })
        ));
    }
}
