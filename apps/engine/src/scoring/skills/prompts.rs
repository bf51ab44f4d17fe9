// Skill-extraction prompt.

use crate::llm_client::prompts::{delimited, GROUNDING_INSTRUCTION, JSON_ONLY_INSTRUCTION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    Resume,
    Job,
}

impl TextKind {
    fn label(&self) -> &'static str {
        match self {
            TextKind::Resume => "CURRÍCULO",
            TextKind::Job => "VAGA",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            TextKind::Resume => "currículo",
            TextKind::Job => "descrição de vaga",
        }
    }
}

pub fn build_extraction_prompt(kind: TextKind, text: &str) -> String {
    format!(
        r#"Você é um analista técnico de recrutamento. Extraia as habilidades do {noun} abaixo.

{document}

Retorne um objeto JSON com exatamente estes campos:
{{
  "technical_skills": ["tecnologias, linguagens, ferramentas e plataformas"],
  "soft_skills": ["competências comportamentais"],
  "domains": ["áreas de atuação, ex: devops, cloud, data science, backend"],
  "seniority": "junior | pleno | senior | specialist | lead | manager | unknown",
  "summary": "uma frase resumindo o perfil"
}}

Regras:
- Escreva siglas também por extenso e nomes completos também como sigla, e inclua ambos os termos na lista (ex: "K8s" e "Kubernetes", "IaC" e "Infrastructure as Code").
- Seja exaustivo: liste todas as tecnologias, ferramentas e competências citadas, mesmo as mencionadas uma única vez.
- Listas vazias são permitidas; não repita itens.
- {grounding}
- {json_only}"#,
        noun = kind.noun(),
        document = delimited(kind.label(), text),
        grounding = GROUNDING_INSTRUCTION,
        json_only = JSON_ONLY_INSTRUCTION,
    )
}
