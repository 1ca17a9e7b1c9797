//! Usage: `cargo run --example movement_report [base.csv current.csv inclusions.csv [out_dir]]`
//!
//! Without arguments a small built-in sample is used.

use client_movement_reconciler::{
    read_csv_path, read_csv_table, MovementInputs, RawTable, ReconciliationConfig,
    RosterReconciler,
};
use std::env;

const SAMPLE_BASE: &str = "\
Positivador,Dt Entrada,Dt Saída,Cliente,Classe,Nome,Farmer / Hunter,Trader
Sim,01/01/2023,,1001,PF,Ana Lima,Carla,Mesa 1
Sim,15/02/2023,,1002,PF,Bruno Reis,Carla,Mesa 1
Nao,03/03/2023,,1003,PJ,Cia Azul,Diego,Mesa 2
Sim,04/04/2023,,1004,PJ,Cia Verde,,Mesa 2
";

const SAMPLE_CURRENT: &str = "\
Cliente,Patrimonio,Data Processamento
1002.0,1500.50,2024-06-30
1003,900,2024-06-30
2001,50,2024-06-30
2002,75,2024-06-30
";

const SAMPLE_INCLUSIONS: &str = "\
CODIGO DO CLIENTE,ASSESSOR
2001,Carla
";

fn load_inputs(args: &[String]) -> anyhow::Result<MovementInputs> {
    if args.len() >= 3 {
        return Ok(MovementInputs::new(
            read_csv_path(&args[0])?,
            read_csv_path(&args[1])?,
            read_csv_path(&args[2])?,
        ));
    }

    let sample = |csv: &str| -> anyhow::Result<RawTable> { Ok(read_csv_table(csv.as_bytes())?) };
    Ok(MovementInputs::new(
        sample(SAMPLE_BASE)?,
        sample(SAMPLE_CURRENT)?,
        sample(SAMPLE_INCLUSIONS)?,
    ))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let inputs = load_inputs(&args)?;

    let reconciler = RosterReconciler::new(ReconciliationConfig::default());
    let report = reconciler.run(inputs)?;

    println!("Relatório de Movimentações");
    println!("{:<20} {:>8} {:>9} {:>7} {:>6}", "", "Início", "Entradas", "Saídas", "Fim");
    for row in report.movement.rows() {
        println!(
            "{:<20} {:>8} {:>9} {:>7} {:>6}",
            row.label, row.start, row.entries, row.exits, row.end
        );
    }

    println!();
    for line in report.summary.lines() {
        println!("{}", line);
    }

    println!();
    println!("Clientes por Farmer:");
    for row in &report.rollup_by_agent.rows {
        println!(" - {}: {}", row.agent, row.clients);
    }
    println!(" = {}", report.rollup_by_agent.grand_total());

    println!();
    println!("Clientes por Classe e Farmer:");
    for class in report.rollup_by_class_and_agent.classes() {
        println!(" {}", class);
        for row in report.rollup_by_class_and_agent.rows_for_class(class) {
            println!("   - {}: {}", row.agent, row.clients);
        }
    }

    if let Some(out_dir) = args.get(3) {
        let written = report.to_workbook().write_csv_dir(out_dir)?;
        println!();
        println!("Wrote {} sheets to {}", written.len(), out_dir);
    }

    Ok(())
}
