use loyalmint_core::TIERS;

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&TIERS)?);
        return Ok(());
    }
    for def in &TIERS {
        println!(
            "{:<9} {:>5}+ points  x{:<4} {}",
            def.name,
            def.minimum_points,
            def.multiplier(),
            def.display_color
        );
    }
    Ok(())
}
