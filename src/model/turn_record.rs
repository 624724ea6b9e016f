use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Label of one of the three choices the narrator offers each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionId {
    A,
    B,
    C,
}

impl OptionId {
    /// The only valid id sequence for a turn's options.
    pub const ALL: [OptionId; 3] = [OptionId::A, OptionId::B, OptionId::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionId::A => "A",
            OptionId::B => "B",
            OptionId::C => "C",
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionId {
    type Err = String;

    /// Player input is trimmed and matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(OptionId::A),
            "B" | "b" => Ok(OptionId::B),
            "C" | "c" => Ok(OptionId::C),
            other => Err(format!("'{}' is not one of A, B, C", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOption {
    pub id: OptionId,
    pub text: String,
}

/// PESTEL category of a turn.
///
/// Labels coming from the narrator are canonicalized when they mention one of
/// the six dimensions; anything else is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PestelDimension {
    Political,
    Economic,
    Social,
    Technological,
    Environmental,
    Legal,
    Other(String),
}

impl PestelDimension {
    pub fn label(&self) -> &str {
        match self {
            PestelDimension::Political => "Political",
            PestelDimension::Economic => "Economic",
            PestelDimension::Social => "Social",
            PestelDimension::Technological => "Technological",
            PestelDimension::Environmental => "Environmental",
            PestelDimension::Legal => "Legal",
            PestelDimension::Other(label) => label,
        }
    }

    pub fn is_canonical(&self) -> bool {
        !matches!(self, PestelDimension::Other(_))
    }
}

impl From<String> for PestelDimension {
    fn from(raw: String) -> Self {
        let lower = raw.trim().to_lowercase();

        // Narrators often answer "Economic (经济)" or "Next: Legal"
        let canonical = [
            ("politic", "政治", PestelDimension::Political),
            ("econom", "经济", PestelDimension::Economic),
            ("social", "社会", PestelDimension::Social),
            ("technolog", "技术", PestelDimension::Technological),
            ("environment", "环境", PestelDimension::Environmental),
            ("legal", "法律", PestelDimension::Legal),
        ];

        for (english, chinese, dimension) in canonical {
            if lower.contains(english) || lower.contains(chinese) {
                return dimension;
            }
        }

        PestelDimension::Other(raw.trim().to_string())
    }
}

impl From<PestelDimension> for String {
    fn from(dimension: PestelDimension) -> Self {
        dimension.label().to_string()
    }
}

impl fmt::Display for PestelDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The structured payload exactly as the narrator is asked to emit it.
/// Nothing here is trusted until it has been turned into a [`TurnRecord`].
#[derive(Debug, Clone, Deserialize)]
pub struct TurnPayload {
    pub story: String,
    pub money_change: i64,
    pub market_share_change: i64,
    #[serde(default)]
    pub analysis: String,
    pub next_pestel: String,
    pub options: Vec<PayloadOption>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadOption {
    pub id: String,
    pub text: String,
}

/// One validated narrated step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub story: String,
    pub money_delta: i64,
    pub market_share_delta: i64,
    pub analysis: String,
    pub dimension: PestelDimension,
    options: [TurnOption; 3],
}

impl TurnRecord {
    /// Builds a record from the three option texts, labelled A, B, C.
    pub fn new(
        story: impl Into<String>,
        money_delta: i64,
        market_share_delta: i64,
        analysis: impl Into<String>,
        dimension: PestelDimension,
        option_texts: [String; 3],
    ) -> Self {
        let [a, b, c] = option_texts;
        Self {
            story: story.into(),
            money_delta,
            market_share_delta,
            analysis: analysis.into(),
            dimension,
            options: [
                TurnOption { id: OptionId::A, text: a },
                TurnOption { id: OptionId::B, text: b },
                TurnOption { id: OptionId::C, text: c },
            ],
        }
    }

    pub fn options(&self) -> &[TurnOption; 3] {
        &self.options
    }

    /// Same record with both deltas forced to zero.
    pub fn without_deltas(mut self) -> Self {
        self.money_delta = 0;
        self.market_share_delta = 0;
        self
    }
}

impl TryFrom<TurnPayload> for TurnRecord {
    type Error = String;

    fn try_from(payload: TurnPayload) -> Result<Self, Self::Error> {
        if payload.options.len() != 3 {
            return Err(format!(
                "expected exactly 3 options, got {}",
                payload.options.len()
            ));
        }

        for (option, expected) in payload.options.iter().zip(OptionId::ALL) {
            if option.id.trim() != expected.as_str() {
                return Err(format!(
                    "option ids must be A, B, C in order; found '{}' where '{}' was expected",
                    option.id, expected
                ));
            }
        }

        let mut texts = payload.options.into_iter().map(|o| o.text);
        let option_texts = [
            texts.next().unwrap_or_default(),
            texts.next().unwrap_or_default(),
            texts.next().unwrap_or_default(),
        ];

        Ok(TurnRecord::new(
            payload.story,
            payload.money_change,
            payload.market_share_change,
            payload.analysis,
            PestelDimension::from(payload.next_pestel),
            option_texts,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(ids: &[&str]) -> TurnPayload {
        TurnPayload {
            story: "Tariffs loom".into(),
            money_change: -20,
            market_share_change: 2,
            analysis: String::new(),
            next_pestel: "Economic".into(),
            options: ids
                .iter()
                .map(|id| PayloadOption {
                    id: id.to_string(),
                    text: format!("option {}", id),
                })
                .collect(),
        }
    }

    #[test]
    fn option_id_parses_trimmed_and_case_insensitive() {
        assert_eq!(" b ".parse::<OptionId>(), Ok(OptionId::B));
        assert_eq!("c".parse::<OptionId>(), Ok(OptionId::C));
        assert!("Z".parse::<OptionId>().is_err());
        assert!("AB".parse::<OptionId>().is_err());
        assert!("".parse::<OptionId>().is_err());
    }

    #[test]
    fn payload_with_abc_becomes_record() {
        let record = TurnRecord::try_from(payload(&["A", "B", "C"])).unwrap();

        assert_eq!(record.money_delta, -20);
        assert_eq!(record.market_share_delta, 2);
        assert_eq!(record.dimension, PestelDimension::Economic);
        let ids: Vec<_> = record.options().iter().map(|o| o.id).collect();
        assert_eq!(ids, OptionId::ALL.to_vec());
        assert_eq!(record.options()[1].text, "option B");
    }

    #[test]
    fn wrong_option_count_is_rejected_not_truncated() {
        assert!(TurnRecord::try_from(payload(&["A", "B"])).is_err());
        assert!(TurnRecord::try_from(payload(&["A", "B", "C", "D"])).is_err());
    }

    #[test]
    fn out_of_order_ids_are_rejected() {
        let err = TurnRecord::try_from(payload(&["B", "A", "C"])).unwrap_err();
        assert!(err.contains("A, B, C in order"));
    }

    #[test]
    fn dimension_labels_are_canonicalized_when_recognized() {
        assert_eq!(
            PestelDimension::from("Technological (技术)".to_string()),
            PestelDimension::Technological
        );
        assert_eq!(
            PestelDimension::from("法律".to_string()),
            PestelDimension::Legal
        );
        assert_eq!(
            PestelDimension::from("  Wildcard ".to_string()),
            PestelDimension::Other("Wildcard".into())
        );
    }

    #[test]
    fn without_deltas_keeps_everything_else() {
        let record = TurnRecord::try_from(payload(&["A", "B", "C"])).unwrap();
        let zeroed = record.clone().without_deltas();

        assert_eq!(zeroed.money_delta, 0);
        assert_eq!(zeroed.market_share_delta, 0);
        assert_eq!(zeroed.story, record.story);
        assert_eq!(zeroed.options(), record.options());
    }
}
