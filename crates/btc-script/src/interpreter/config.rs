//! Interpreter resource limits.

pub const MAX_OPS_PER_SCRIPT: usize = 201;
pub const MAX_STACK_SIZE: usize = 1000;
pub const MAX_SCRIPT_SIZE: usize = 10000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

/// Script configuration limits.
#[derive(Default)]
pub struct Config;

impl Config {
    pub fn new() -> Self {
        Config
    }

    pub fn max_ops(&self) -> usize {
        MAX_OPS_PER_SCRIPT
    }

    pub fn max_stack_size(&self) -> usize {
        MAX_STACK_SIZE
    }

    pub fn max_script_size(&self) -> usize {
        MAX_SCRIPT_SIZE
    }

    pub fn max_script_element_size(&self) -> usize {
        MAX_SCRIPT_ELEMENT_SIZE
    }

    pub fn max_script_number_length(&self) -> usize {
        MAX_SCRIPT_NUMBER_LENGTH
    }

    pub fn max_pub_keys_per_multisig(&self) -> usize {
        MAX_PUB_KEYS_PER_MULTISIG
    }
}
