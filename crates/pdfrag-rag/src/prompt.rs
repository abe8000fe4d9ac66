//! Prompt template for grounded answers
//!
//! The template restricts the model to the retrieved context and asks for a
//! fixed refusal sentence when the context does not contain the answer.
//! Compliance is up to the model; answers are not checked against the
//! context afterwards.

use std::collections::HashMap;

use pdfrag_core::{RagError, Result};

/// Sentence the model must return when the context has no answer
pub const REFUSAL_SENTENCE: &str = "Não tenho informações necessárias para responder sua pergunta.";

/// Question-answering template with the `contexto` and `pergunta` slots
pub const PROMPT_TEMPLATE: &str = r#"
CONTEXTO:
{contexto}

REGRAS:
- Responda somente com base no CONTEXTO.
- Se a informação não estiver explicitamente no CONTEXTO, responda:
  "Não tenho informações necessárias para responder sua pergunta."
- Nunca invente ou use conhecimento externo.
- Nunca produza opiniões ou interpretações além do que está escrito.

EXEMPLOS DE PERGUNTAS FORA DO CONTEXTO:
Pergunta: "Qual é a capital da França?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

Pergunta: "Quantos clientes temos em 2024?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

Pergunta: "Você acha isso bom ou ruim?"
Resposta: "Não tenho informações necessárias para responder sua pergunta."

PERGUNTA DO USUÁRIO:
{pergunta}

RESPONDA A "PERGUNTA DO USUÁRIO"
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Variable(String),
}

/// A template with `{name}` slots; `{{` and `}}` are literal braces
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
    input_variables: Vec<String>,
}

impl PromptTemplate {
    /// Parse a template
    pub fn new(template: &str) -> Result<Self> {
        let segments = parse_segments(template)?;

        let mut input_variables: Vec<String> = Vec::new();
        for segment in &segments {
            if let Segment::Variable(name) = segment {
                if !input_variables.contains(name) {
                    input_variables.push(name.clone());
                }
            }
        }

        Ok(Self {
            segments,
            input_variables,
        })
    }

    /// Slot names, in order of first appearance
    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Fill every slot; a slot without a value is an error
    pub fn render(&self, values: &HashMap<&str, &str>) -> Result<String> {
        let mut output = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => output.push_str(text),
                Segment::Variable(name) => {
                    let value = values.get(name.as_str()).ok_or_else(|| {
                        RagError::Prompt(format!("missing value for template variable '{name}'"))
                    })?;
                    output.push_str(value);
                }
            }
        }
        Ok(output)
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some('{') | None => {
                            return Err(RagError::Prompt(
                                "unterminated '{' in template".to_string(),
                            ))
                        }
                        Some(ch) => name.push(ch),
                    }
                }
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(RagError::Prompt("empty template variable".to_string()));
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Variable(name));
            }
            '}' => {
                return Err(RagError::Prompt(
                    "single '}' encountered in template".to_string(),
                ))
            }
            other => text.push(other),
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }

    Ok(segments)
}

/// Render the question-answering prompt
pub fn render_search_prompt(contexto: &str, pergunta: &str) -> Result<String> {
    let template = PromptTemplate::new(PROMPT_TEMPLATE)?;
    let values = HashMap::from([("contexto", contexto), ("pergunta", pergunta)]);
    template.render(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_slots() {
        let template = PromptTemplate::new(PROMPT_TEMPLATE).unwrap();
        assert_eq!(template.input_variables(), ["contexto", "pergunta"]);
    }

    #[test]
    fn test_render_search_prompt() {
        let prompt =
            render_search_prompt("O prazo é de 30 dias.", "Qual é o prazo de entrega?").unwrap();

        assert!(prompt.starts_with("\nCONTEXTO:\nO prazo é de 30 dias.\n\nREGRAS:"));
        assert!(prompt.contains("PERGUNTA DO USUÁRIO:\nQual é o prazo de entrega?\n"));
        assert!(prompt.ends_with("RESPONDA A \"PERGUNTA DO USUÁRIO\"\n"));
        assert!(!prompt.contains("{contexto}"));
        assert!(!prompt.contains("{pergunta}"));
    }

    #[test]
    fn test_template_contains_refusal_sentence() {
        assert_eq!(PROMPT_TEMPLATE.matches(REFUSAL_SENTENCE).count(), 4);
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let prompt = render_search_prompt("chaves {pergunta} literais", "{x}").unwrap();
        assert!(prompt.contains("chaves {pergunta} literais"));
        assert!(prompt.contains("PERGUNTA DO USUÁRIO:\n{x}\n"));
    }

    #[test]
    fn test_missing_value() {
        let template = PromptTemplate::new("Oi {nome}").unwrap();
        let err = template.render(&HashMap::new()).unwrap_err();
        assert!(matches!(err, RagError::Prompt(_)));
    }

    #[test]
    fn test_escaped_and_malformed_braces() {
        let template = PromptTemplate::new("{{literal}} {slot}").unwrap();
        let rendered = template
            .render(&HashMap::from([("slot", "valor")]))
            .unwrap();
        assert_eq!(rendered, "{literal} valor");

        assert!(PromptTemplate::new("aberto {").is_err());
        assert!(PromptTemplate::new("fechado }").is_err());
        assert!(PromptTemplate::new("vazio {}").is_err());
    }
}
