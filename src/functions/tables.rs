use super::{Arity, Category, FunctionRegistry};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    // Lookup(key, table, column[, default])
    registry.add("Lookup", Arity::Range(3, 4), Category::Lookup, |ctx, args| {
        let key = args.string(0)?;
        let table_name = args.string(1)?;
        let column = args.index(2)?;
        let default = args.optional_string(3).unwrap_or_default();

        if column < 1 {
            return Ok(Value::String(default));
        }

        let table = ctx.tables().get(&table_name)?;
        let cell = table
            .cell(&key, column as usize)
            .map_or(default, str::to_string);
        Ok(Value::String(cell))
    });
}
