//! Helpers for constructor arguments.

use alloy_core::dyn_abi::DynSolValue;
use serde::Serializer;

/// Render a value the way `forge` expects it on the command line.
///
/// Arrays are rendered as `[a,b]` and tuples as `(a,b)`.
pub fn format_arg(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Function(func) => format!("0x{}", hex::encode(func.as_slice())),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", join(items))
        }
        DynSolValue::Tuple(items) => format!("({})", join(items)),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

fn join(items: &[DynSolValue]) -> String {
    items.iter().map(format_arg).collect::<Vec<_>>().join(",")
}

/// ABI-encode constructor arguments as a hex string without `0x` prefix.
///
/// Returns an empty string when there are no arguments.
pub fn encode_constructor_args(args: &[DynSolValue]) -> String {
    if args.is_empty() {
        return String::new();
    }
    hex::encode(DynSolValue::Tuple(args.to_vec()).abi_encode_params())
}

/// Serialize constructor arguments as their command-line rendering.
pub(crate) fn serialize_args<S>(args: &[DynSolValue], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(args.iter().map(format_arg))
}
