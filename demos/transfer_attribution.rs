//! Usage: `cargo run --example transfer_attribution [transfers.csv assignments.csv MM/YYYY [out_dir]]`
//!
//! Without arguments a small built-in sample for 03/2024 is used.

use client_movement_reconciler::{
    read_csv_path, read_csv_table, ReconciliationConfig, RosterReconciler,
};
use std::env;

const SAMPLE_TRANSFERS: &str = "\
Código do Cliente,Nome Assessor Origem,Nome Assessor Destino,Status,Data Transferência
500,,Carla,CONCLUIDO,10/03/2024 09:15:00
501,Diego,,CONCLUIDO,11/03/2024 10:00:00
502,Carla,Diego,CONCLUIDO,12/03/2024 11:00:00
503,,Diego,PENDENTE,13/03/2024 12:00:00
505,Externo,,CONCLUIDO,20/03/2024 14:30:00
";

const SAMPLE_ASSIGNMENTS: &str = "\
Cliente,Farmer
500,Carla
501,Diego
502,Diego
600,Carla
";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let (transfers, assignments, month) = if args.len() >= 3 {
        (
            read_csv_path(&args[0])?,
            read_csv_path(&args[1])?,
            args[2].clone(),
        )
    } else {
        (
            read_csv_table(SAMPLE_TRANSFERS.as_bytes())?,
            read_csv_table(SAMPLE_ASSIGNMENTS.as_bytes())?,
            "03/2024".to_string(),
        )
    };

    let reconciler = RosterReconciler::new(ReconciliationConfig::default());
    let report = reconciler.attribute_transfers(&transfers, &assignments, &month)?;

    println!("Resumo por Assessor ({})", report.month);
    println!(
        "{:<20} {:>8} {:>9} {:>7} {:>6}",
        "Assessor", "Inicial", "Entradas", "Saídas", "Final"
    );
    for row in report.summary.iter().chain(std::iter::once(&report.total)) {
        println!(
            "{:<20} {:>8} {:>9} {:>7} {:>6}",
            row.agent, row.initial, row.entries, row.exits, row.final_count
        );
    }

    println!();
    println!("Detalhes Clientes:");
    for detail in &report.details {
        println!(
            " - {} {} -> {} ({})",
            detail.client, detail.origin_agent, detail.destination_agent, detail.status
        );
    }
    println!(
        "{} internal reassignments kept out of the summary",
        report.internal_reassignments
    );

    if let Some(out_dir) = args.get(3) {
        let written = report.to_workbook().write_csv_dir(out_dir)?;
        println!("Wrote {} sheets to {}", written.len(), out_dir);
    }

    Ok(())
}
