use std::sync::Arc;

use super::tokens::{TagScheme, TokenPipeline};
use super::{decode, write_outputs, SlotWriter, Standardize, Target, ADDRESS_SLOTS};
use crate::config::AddressStandardizerConfig;
use crate::error::LinkageError;
use crate::hmm::HmmModel;
use crate::model::StandardizedRecord;
use crate::resources::Resources;

/// HMM segmentation of a postal address into the sixteen address slots.
#[derive(Debug, Clone)]
pub struct AddressStandardizer {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
    tokens: TokenPipeline,
    hmm: Arc<HmmModel>,
    separator: String,
    rubbish_field: Option<String>,
    prob_field: Option<String>,
}

impl AddressStandardizer {
    pub fn assemble(config: &AddressStandardizerConfig, resources: &Resources) -> Result<Self, LinkageError> {
        let lookup = resources.lookup_table(&config.lookup_table)?;
        let corrections = config
            .correction_list
            .as_deref()
            .map(|name| resources.correction_list(name))
            .transpose()?;
        Ok(Self {
            input_fields: config.input_fields.as_slice().to_vec(),
            output_fields: config.output_fields.clone(),
            tokens: TokenPipeline::new(lookup, corrections, TagScheme::Address, config.check_word_spill),
            hmm: resources.hmm(&config.hmm)?,
            separator: config.field_separator.clone(),
            rubbish_field: config.rubbish_field.clone(),
            prob_field: config.prob_field.clone(),
        })
    }
}

impl Standardize for AddressStandardizer {
    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn standardize(&self, values: &[&str], out: &mut StandardizedRecord) {
        let tokens = TokenPipeline::flatten(self.tokens.tag_fields(values));
        if tokens.is_empty() {
            return;
        }
        let decoded = decode(&self.hmm, &tokens);

        let mut writer = SlotWriter::new(ADDRESS_SLOTS.len());
        for (i, token) in tokens.iter().enumerate() {
            let text = token
                .entries
                .get(decoded.choice[i])
                .map_or(token.original.as_str(), |e| e.canonical.as_str());
            writer.push(address_target(self.hmm.state_name(decoded.states[i])), text);
        }

        write_outputs(
            out,
            &self.output_fields,
            (0..ADDRESS_SLOTS.len()).map(|i| writer.slot(i, &self.separator)),
        );
        if let Some(field) = &self.rubbish_field {
            out.set(field, writer.rubbish(&self.separator));
        }
        if let Some(field) = &self.prob_field {
            out.set(field, format!("{:e}", decoded.log_probability.exp()));
        }
    }
}

fn address_target(state: &str) -> Target {
    let slot = match state {
        "wfnu" => 0,
        "wfna1" | "wfna2" => 1,
        "wfql" => 2,
        "wfty" => 3,
        "unnu" => 4,
        "unty" => 5,
        "prna1" | "prna2" => 6,
        "inna1" | "inna2" => 7,
        "inty" => 8,
        "panu" => 9,
        "paty" => 10,
        "loc1" | "loc2" => 11,
        "locql" => 12,
        "pc" => 13,
        "ter1" | "ter2" => 14,
        "cntr1" | "cntr2" => 15,
        "hyph" | "sla" | "coma" | "opbr" | "clbr" => return Target::Drop,
        _ => return Target::Rubbish,
    };
    Target::Slot(slot)
}
