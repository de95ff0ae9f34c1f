// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later

use stepkit_runtime::{StepArguments, register_step_type, step_methods};

use crate::base::BaseFunction;

/// A bag of method-based step functions
#[derive(Debug, Default, StepArguments)]
pub struct Functions {
    #[arg(flatten)]
    pub base: BaseFunction,
}

#[step_methods]
impl Functions {
    #[step(display_name = "Cheesey hello")]
    pub fn cheese(
        &self,
        #[arg(display_name = "Name")] name: String,
        #[arg(display_name = "Amount", default = "1")] amount: i32,
    ) -> String {
        format!("Hello {} #{}", name, amount)
    }

    #[step(display_name = "Finds the beer")]
    pub fn beer(&self, location: String) -> String {
        self.base.logger.info(format!("looking in {}", location));
        format!("beer:{}", location)
    }

    /// Not a step: no marker
    pub fn describe_location(&self, location: &str) -> String {
        format!("somewhere near {}", location)
    }
}

register_step_type!(Functions: methods);

#[cfg(test)]
mod tests {
    use super::*;
    use stepkit_runtime::StepMethods;

    #[test]
    fn test_only_marked_methods_are_steps() {
        let names: Vec<_> = Functions::step_methods()
            .iter()
            .map(|m| m.function_name())
            .collect();
        assert_eq!(names, vec!["cheese", "beer"]);
    }

    #[test]
    fn test_method_entries_carry_parameters() {
        let methods = Functions::step_methods();
        let cheese = &methods[0];
        assert_eq!(cheese.return_type, "String");
        assert_eq!(cheese.parameters.len(), 2);
        assert_eq!(cheese.parameters[1].name, "amount");
        assert_eq!(cheese.parameters[1].default_value, Some("1"));
        assert_eq!(cheese.marker.display_name(), Some("Cheesey hello"));
    }
}
