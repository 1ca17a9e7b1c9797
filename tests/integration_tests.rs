use client_movement_reconciler::*;
use std::collections::BTreeSet;

const BASE_CSV: &str = "\
Sistema,Entrada,Saida,Codigo,Tipo,Nome Cliente,Responsavel,Mesa
Sim,01/01/2023,,1001,PF,Ana Lima,Carla,Mesa 1
Sim,15/02/2023,,1002.0,PF,Bruno Reis,Carla,Mesa 1
Nao,03/03/2023,,1003,PJ,Cia Azul,Diego,Mesa 2
Sim,04/04/2023,,AB-77,PJ,Cia Verde,Diego,Mesa 2
Sim,05/05/2023,,1002,PF,Bruno Reis (dup),Elisa,Mesa 3
Sim,06/06/2023,,,PF,Sem Codigo,Elisa,Mesa 3
";

const CURRENT_CSV: &str = "\
Cliente,Patrimonio,Data Processamento
1002,1500.50,2024-06-30
1003.0,900,2024-06-30
ab-77 ,120,30/06/2024
2001,50,sem data
2002,75,2024-06-30
,10,2024-06-30
";

const INCLUSIONS_CSV: &str = "\
CODIGO DO CLIENTE,ASSESSOR
2001.0,Carla
9999,Diego
nan,Elisa
";

fn load(csv: &str) -> RawTable {
    read_csv_table(csv.as_bytes()).expect("fixture csv should parse")
}

fn keys(values: &[&str]) -> ClientSet {
    values.iter().filter_map(|v| normalize_key(v)).collect()
}

fn run_fixture() -> MovementReport {
    run_movement_report(
        load(BASE_CSV),
        load(CURRENT_CSV),
        load(INCLUSIONS_CSV),
        &ReconciliationConfig::default(),
    )
    .expect("fixture reconciliation should succeed")
}

#[test]
fn test_fixture_classification() {
    let report = run_fixture();
    let rec = &report.reconciliation;

    assert_eq!(rec.stayed, keys(&["1002", "1003", "ab-77"]));
    assert_eq!(rec.entered, keys(&["2001", "2002"]));
    assert_eq!(rec.left, keys(&["1001"]));
    assert_eq!(rec.attributed_entries, keys(&["2001"]));
    assert_eq!(rec.untracked_entries(), keys(&["2002"]));
}

#[test]
fn test_fixture_movement_table() {
    let report = run_fixture();
    let table = &report.movement;

    assert_eq!(table.total, MovementRow::new("Total", 4, 2, 1));
    assert_eq!(table.total.end, 5);
    assert_eq!(table.within_tracked, MovementRow::new("Dentro Positivador", 3, 0, 0));
    assert_eq!(table.outside_tracked, MovementRow::new("Fora Positivador", 1, 2, 1));

    for row in table.rows() {
        assert_eq!(row.end, row.start + row.entries - row.exits);
    }
}

#[test]
fn test_fixture_summary_and_details() {
    let report = run_fixture();

    assert_eq!(
        report.summary,
        MovementSummary {
            stayed: 3,
            entered: 2,
            left: 1,
            inclusions: 2,
            base_total: 4,
            attributed_entries: 1,
            untracked_entries: 1,
        }
    );

    assert_eq!(report.stayed_detail.len(), 3);
    assert_eq!(report.left_detail.len(), 1);
    assert_eq!(report.entered_detail.len(), 2);
    assert_eq!(report.inclusions_detail.len(), 2);
    assert_eq!(report.attributed_detail.len(), 1);
    assert_eq!(report.untracked_detail.len(), 1);

    let client_col = report.left_detail.column_index("Cliente").unwrap();
    assert_eq!(
        report.left_detail.cell(0, client_col),
        &CellValue::Text("1001".to_string())
    );

    let patrimony_col = report.untracked_detail.column_index("Patrimonio").unwrap();
    assert_eq!(report.untracked_detail.cell(0, patrimony_col), &CellValue::Int(75));
}

#[test]
fn test_duplicate_base_rows_counted_once() {
    let report = run_fixture();

    let by_agent: Vec<(String, i64)> = report
        .rollup_by_agent
        .rows
        .iter()
        .map(|r| (r.agent.clone(), r.clients))
        .collect();

    // 1002 appears twice; the first row (Carla) wins and Elisa keeps only the
    // row without a client code, which is not counted.
    assert_eq!(
        by_agent,
        vec![("Carla".to_string(), 2), ("Diego".to_string(), 2)]
    );
    assert_eq!(report.rollup_by_agent.grand_total(), 4);
}

#[test]
fn test_rollup_total_invariant() {
    let report = run_fixture();

    for rollup in [&report.rollup_by_agent, &report.rollup_by_class_and_agent] {
        let sum: i64 = rollup.rows.iter().map(|r| r.clients).sum();
        assert_eq!(rollup.total.clients, sum);
    }

    let subtotals: i64 = report
        .rollup_by_class_and_agent
        .class_subtotals()
        .iter()
        .map(|r| r.clients)
        .sum();
    assert_eq!(subtotals, report.rollup_by_class_and_agent.grand_total());
}

#[test]
fn test_float_typed_identifier_is_stayed() {
    let mut base = RawTable::with_headers(&BASE_ROSTER_COLUMNS);
    base.push_row(vec![
        CellValue::Empty,
        CellValue::Empty,
        CellValue::Empty,
        CellValue::Number(42.0),
        CellValue::Empty,
        CellValue::Empty,
        CellValue::from("Ana"),
        CellValue::Empty,
    ]);
    let mut current = RawTable::with_headers(&["Cliente"]);
    current.push_row(vec![CellValue::from("42")]);
    let inclusions = RawTable::with_headers(&["CODIGO DO CLIENTE"]);

    let report =
        run_movement_report(base, current, inclusions, &ReconciliationConfig::default()).unwrap();

    assert_eq!(report.reconciliation.stayed, keys(&["42"]));
    assert!(report.reconciliation.entered.is_empty());
    assert!(report.reconciliation.left.is_empty());
}

#[test]
fn test_wide_and_padded_codes_stay_distinct_clients() {
    let mut base = RawTable::with_headers(&BASE_ROSTER_COLUMNS);
    for code in ["12345678901234567890", "98765432109876543210", "123"] {
        base.push_row(vec![
            CellValue::Empty,
            CellValue::Empty,
            CellValue::Empty,
            CellValue::infer(code),
            CellValue::Empty,
            CellValue::Empty,
            CellValue::from("Ana"),
            CellValue::Empty,
        ]);
    }
    let current = load("Cliente\n12345678901234567890\n98765432109876543210\n00123\n1E3\n");
    let inclusions = RawTable::with_headers(&["CODIGO DO CLIENTE"]);

    let report =
        run_movement_report(base, current, inclusions, &ReconciliationConfig::default()).unwrap();

    assert_eq!(
        report.reconciliation.stayed,
        keys(&["12345678901234567890", "98765432109876543210"])
    );
    assert_eq!(report.reconciliation.entered, keys(&["00123", "1e3"]));
    assert_eq!(report.reconciliation.left, keys(&["123"]));
    assert_eq!(report.rollup_by_agent.grand_total(), 3);
}

#[test]
fn test_absent_identifiers_never_counted() {
    let report = run_fixture();
    let universe = report.reconciliation.universe();

    assert!(universe.iter().all(|k| !k.as_str().is_empty()));
    assert!(!universe.contains(&normalize_key("nan").unwrap()));
    assert_eq!(universe.len(), 6);
}

#[test]
fn test_partition_totality() {
    let report = run_fixture();
    let rec = &report.reconciliation;

    let base: ClientSet = rec.stayed.union(&rec.left).cloned().collect();
    let current: ClientSet = rec.stayed.union(&rec.entered).cloned().collect();
    assert!(rec.is_partition_of(&base, &current));

    let classes = [&rec.stayed, &rec.entered, &rec.left];
    let total: usize = classes.iter().map(|c| c.len()).sum();
    let union: BTreeSet<&ClientId> = classes.iter().flat_map(|c| c.iter()).collect();
    assert_eq!(total, union.len());
}

#[test]
fn test_schema_mismatch_names_found_and_expected_headers() {
    let base = load("A,B,C,D,E,F,G\n1,2,3,4,5,6,7\n");

    let err = run_movement_report(
        base,
        load(CURRENT_CSV),
        load(INCLUSIONS_CSV),
        &ReconciliationConfig::default(),
    )
    .unwrap_err();

    match &err {
        ReconciliationError::SchemaMismatch {
            table,
            expected,
            found,
        } => {
            assert_eq!(table, BASE_ROSTER_TABLE);
            assert_eq!(expected.len(), 8);
            assert_eq!(found, &vec!["A", "B", "C", "D", "E", "F", "G"]);
        }
        other => panic!("expected schema mismatch, got {:?}", other),
    }

    let message = err.to_string();
    assert!(message.contains("has 7 columns, expected 8"), "{}", message);
}

#[test]
fn test_missing_client_column_aborts_run() {
    let current = load("Conta,Patrimonio\n1,2\n");

    let err = run_movement_report(
        load(BASE_CSV),
        current,
        load(INCLUSIONS_CSV),
        &ReconciliationConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ReconciliationError::MissingColumn { ref column, .. } if column == "Cliente"));
}

#[test]
fn test_custom_column_names_from_config() {
    let config = ReconciliationConfig::from_json_str(
        r#"{ "current_client_column": "Conta", "inclusion_client_column": "Codigo" }"#,
    )
    .unwrap();

    let report = run_movement_report(
        load(BASE_CSV),
        load("Conta\n1001\n"),
        load("Codigo\n"),
        &config,
    )
    .unwrap();

    assert_eq!(report.reconciliation.stayed, keys(&["1001"]));
    assert_eq!(report.movement.total.exits, 3);
}

#[test]
fn test_movement_workbook_contains_every_view() {
    let workbook = run_fixture().to_workbook();

    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names.len(), 9);
    assert!(names.contains(&"Relatório de Movimentações"));
    assert!(names.contains(&"Novos Clientes sem Inclusão"));

    let movement = workbook.sheet("Relatório de Movimentações").unwrap();
    assert_eq!(movement.rows[0], vec!["Total", "4", "2", "1", "5"]);
}

const TRANSFERS_CSV: &str = "\
Código do Cliente,Nome Assessor Origem,Nome Assessor Destino,Status,Data Transferência
500,,Carla,CONCLUIDO,10/03/2024 09:15:00
501,Diego,,CONCLUIDO,11/03/2024 10:00:00
502,Carla,Diego,CONCLUIDO,12/03/2024 11:00:00
503,,Diego,PENDENTE,13/03/2024 12:00:00
504,,Carla,CONCLUIDO,01/04/2024 08:00:00
505,Externo,,CONCLUIDO,20/03/2024 14:30:00
506,,Carla,CONCLUIDO,2024-03-21
";

const ASSIGNMENTS_CSV: &str = "\
Cliente,Farmer
500,Carla
501,Diego
502,Diego
503,Diego
600,Carla
501,Carla
";

#[test]
fn test_transfer_attribution_end_to_end() {
    let report = run_transfer_attribution(
        &load(TRANSFERS_CSV),
        &load(ASSIGNMENTS_CSV),
        "03/2024",
        &ReconciliationConfig::default(),
    )
    .unwrap();

    // 503 pending, 504 in April and 506 with an unparseable date are all out.
    assert_eq!(report.filtered_log.len(), 4);
    assert_eq!(report.internal_reassignments, 1);

    let carla = report.agent("Carla").unwrap();
    assert_eq!(
        (carla.initial, carla.entries, carla.exits, carla.final_count),
        (2, 1, 0, 3)
    );

    let diego = report.agent("Diego").unwrap();
    assert_eq!(
        (diego.initial, diego.entries, diego.exits, diego.final_count),
        (3, 0, 1, 2)
    );

    let missing = report.agent("Não Consta").unwrap();
    assert_eq!(
        (missing.initial, missing.entries, missing.exits, missing.final_count),
        (0, 0, 1, -1)
    );

    assert_eq!(report.total.initial, 5);
    assert_eq!(report.total.final_count, 4);

    let statuses: Vec<&str> = report.details.iter().map(|d| d.status.as_str()).collect();
    assert_eq!(statuses, vec!["Entrada", "Saída", "Saída"]);

    let exit_505 = &report.details[2];
    assert_eq!(exit_505.client, normalize_key("505").unwrap());
    assert_eq!(exit_505.origin_agent, "Externo");
    assert_eq!(exit_505.destination_agent, "Não Consta");
}

#[test]
fn test_transfer_workbook_export() {
    let report = run_transfer_attribution(
        &load(TRANSFERS_CSV),
        &load(ASSIGNMENTS_CSV),
        "03/2024",
        &ReconciliationConfig::default(),
    )
    .unwrap();

    let workbook = report.to_workbook();
    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec![AGENT_SUMMARY_SHEET, CLIENT_DETAIL_SHEET]);

    let csv = workbook.sheet(AGENT_SUMMARY_SHEET).unwrap().to_csv_string().unwrap();
    assert!(csv.starts_with("Assessor,Inicial,Entradas,Saídas,Final\n"));
    assert!(csv.ends_with("Total,5,1,2,4\n"));

    let detail = workbook.sheet(CLIENT_DETAIL_SHEET).unwrap();
    assert_eq!(detail.rows[0], vec!["500", "Carla", "Carla", "Entrada"]);
}

#[test]
fn test_transfer_log_missing_column() {
    let transfers = load("Código do Cliente,Status\n1,CONCLUIDO\n");

    let err = run_transfer_attribution(
        &transfers,
        &load(ASSIGNMENTS_CSV),
        "03/2024",
        &ReconciliationConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ReconciliationError::MissingColumn { .. }));
}

#[test]
fn test_transfer_month_selector_validation() {
    let err = run_transfer_attribution(
        &load(TRANSFERS_CSV),
        &load(ASSIGNMENTS_CSV),
        "março/2024",
        &ReconciliationConfig::default(),
    )
    .unwrap_err();

    assert!(matches!(err, ReconciliationError::InvalidMonth(_)));
}
