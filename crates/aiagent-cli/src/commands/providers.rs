//! Provider listing.

use crate::AppContext;

pub fn run(ctx: &AppContext) {
    println!("Available providers:\n");
    for name in ctx.registry.names() {
        let marker = if name == ctx.settings.default_llm_provider {
            " (default)"
        } else {
            ""
        };
        println!("  {}{}", name, marker);
    }
    println!("\nSelect one with --provider or DEFAULT_LLM_PROVIDER.");
}
