//! Prediction request and response bodies
//!
//! Clients send short field names; the model was trained on the full
//! question texts of the survey header, so every field maps to exactly one
//! question.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request field → survey question, in questionnaire order
pub const QUESTION_FIELDS: [(&str, &str); 10] = [
    ("finalidade", "Para qual finalidade pretende usar o moedor?"),
    ("quantidade", "Quantos quilos precisa moer por minuto?"),
    ("voltagem", "Qual é a voltagem que pretende utilizar?"),
    ("tipo_material", "O que irá moer?"),
    ("facil_limpeza", "Prefere modelo mais fácil de limpar?"),
    ("ruido_importante", "Ruído é um fator importante?"),
    ("espaco_limitado", "O espaço físico é limitado?"),
    ("orcamento", "Qual é a faixa de orçamento?"),
    ("remoagem", "Deseja função de remoagem?"),
    ("potencia", "Potência desejada"),
];

/// Body of `POST /predict`
///
/// Any JSON object is accepted; unknown keys are ignored. String answers are
/// used verbatim and numbers are rendered as their JSON text.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PredictRequest {
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl PredictRequest {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Answer for a request field, `""` when absent or not a scalar
    pub fn answer(&self, field: &str) -> String {
        match self.fields.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Question text → answer for every known field
    pub fn answers_by_question(&self) -> BTreeMap<String, String> {
        QUESTION_FIELDS
            .iter()
            .map(|(field, question)| (question.to_string(), self.answer(field)))
            .collect()
    }

    /// Question texts whose answer is blank, in questionnaire order
    pub fn missing_questions(&self) -> Vec<String> {
        QUESTION_FIELDS
            .iter()
            .filter(|(field, _)| self.answer(field).trim().is_empty())
            .map(|(_, question)| question.to_string())
            .collect()
    }
}

/// Successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub success: bool,
    pub produto: String,
    pub respostas: BTreeMap<String, String>,
}

/// Failure body shared by every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthResponse {
    Ok {
        message: String,
        features: usize,
        classes: usize,
        model_hash: String,
    },
    Error {
        message: String,
    },
}
