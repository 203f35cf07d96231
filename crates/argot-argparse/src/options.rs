use std::borrow::Cow;

use crate::decl::{ArgSpec, Command};
use crate::value::ValueKind;

/// Options followed by flags, in declaration order.
///
/// Flags are rewritten into boolean options that never consume a value.
pub fn resolve_options(command: &Command) -> Vec<Cow<'_, ArgSpec>> {
    let options = command.options.iter().map(Cow::Borrowed);
    let flags = command.flags.iter().map(|flag| {
        Cow::Owned(ArgSpec {
            value_kind: Some(ValueKind::Bool),
            value_not_required: true,
            ..flag.clone()
        })
    });
    options.chain(flags).collect()
}

/// Find an option by name or alias.
pub fn find_option<'a>(name: &str, options: &'a [Cow<'_, ArgSpec>]) -> Option<&'a ArgSpec> {
    options
        .iter()
        .map(|opt| opt.as_ref())
        .find(|opt| opt.answers_to(name))
}
