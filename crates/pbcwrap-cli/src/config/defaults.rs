use pbcwrap::engine::config::{Compound, ReferenceAtoms};

/// Values used when neither the command line nor the config file sets an option.
pub struct DefaultsConfig {
    pub compound: Compound,
    pub reference_atoms: ReferenceAtoms,
    pub selection: String,
    pub first_frame: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            compound: Compound::Residue,
            reference_atoms: ReferenceAtoms::All,
            selection: "all".to_string(),
            first_frame: 0,
        }
    }
}
