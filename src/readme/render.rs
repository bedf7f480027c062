use super::ReadmeError;
use super::model::Model;
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};

/// Substitute `${name}` references in `template` with values from `model`.
///
/// Anything else the template engine understands (blocks, comments) keeps its usual
/// syntax. Referencing a name the model does not define is an error.
pub fn render(template: &str, model: &Model) -> Result<String, ReadmeError> {
    let mut env = Environment::new();
    env.set_syntax(SyntaxConfig::builder().variable_delimiters("${", "}").build()?);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    Ok(env.render_str(template, model)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(pairs: &[(&str, &str)]) -> Model {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_substitutes_variables() {
        let rendered = render("value=${A}", &model(&[("A", "1")])).unwrap();
        assert_eq!(rendered, "value=1");
    }

    #[test]
    fn test_double_braces_are_plain_text() {
        let rendered = render("{{ not a var }} ${ v }", &model(&[("v", "x")])).unwrap();
        assert_eq!(rendered, "{{ not a var }} x");
    }

    #[test]
    fn test_snippet_text_is_not_escaped() {
        let rendered = render("```\n${code}```", &model(&[("code", "if (a < b && c) {}\n")])).unwrap();
        assert_eq!(rendered, "```\nif (a < b && c) {}\n```");
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let err = render("value=${missing}", &Model::new()).unwrap_err();
        assert!(matches!(err, ReadmeError::Render(_)));
    }
}
