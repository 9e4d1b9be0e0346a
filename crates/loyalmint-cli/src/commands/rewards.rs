use loyalmint_core::RewardCatalog;
use serde_json::json;

pub fn run(balance: Option<u64>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = RewardCatalog::reference();

    if json {
        let entries: Vec<serde_json::Value> = catalog
            .all()
            .iter()
            .map(|reward| -> Result<serde_json::Value, serde_json::Error> {
                let mut value = serde_json::to_value(reward)?;
                if let (Some(balance), Some(obj)) = (balance, value.as_object_mut()) {
                    obj.insert("affordable".into(), json!(reward.is_affordable(balance)));
                }
                Ok(value)
            })
            .collect::<Result<_, _>>()?;
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for reward in catalog.all() {
        let mark = match balance {
            Some(b) if reward.is_affordable(b) => "[x]",
            Some(_) => "[ ]",
            None => "",
        };
        println!(
            "{mark:<3} {} {:<12} {:<14} {:>5} pts  {}",
            reward.icon, reward.id, reward.name, reward.points_cost, reward.description
        );
    }
    Ok(())
}
