use serde::{Deserialize, Serialize};

/// Sheet and column names for the per-person page (form responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonSheetConfig {
    pub sheet:           String,
    /// Person identifier (RE without check digit).
    pub key_column:      String,
    pub flag_column:     String,
    /// Exact, case-sensitive value meaning "settled".
    pub settled_value:   String,
    pub amount_column:   String,
    /// Columns shown in the search result, in display order.
    pub display_columns: Vec<String>,
    /// Columns coerced to text on load.
    pub text_columns:    Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashFlowConfig {
    pub sheet:         String,
    pub date_column:   String,
    /// Signed amount: inflows positive, withdrawals negative.
    pub amount_column: String,
    pub date_format:   String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalConfig {
    pub sheet:            String,
    pub header:           Vec<String>,
    pub timestamp_format: String,
    /// Grid size used when the sheet has to be created.
    pub new_sheet_rows:   u32,
    pub new_sheet_cols:   u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RanchoConfig {
    pub spreadsheet:       String,
    pub cache_ttl_seconds: i64,
    pub person:            PersonSheetConfig,
    pub cash_flow:         CashFlowConfig,
    pub withdrawals:       WithdrawalConfig,
}

impl RanchoConfig {
    /// Load from `{data_dir}/rancho.json`.
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/rancho.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RanchoConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {path}: {e}"))?;
        Ok(config)
    }

    /// Load `{data_dir}/rancho.json` when present, otherwise the defaults.
    pub fn load_or_default(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/rancho.json");
        if std::path::Path::new(&path).exists() {
            Self::load(data_dir)
        } else {
            log::info!("{path} not found, using built-in configuration");
            Ok(Self::default())
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache_ttl_seconds.max(0))
    }
}

impl Default for RanchoConfig {
    fn default() -> Self {
        Self {
            spreadsheet: "Previsao_de_Rancho".into(),
            cache_ttl_seconds: 300,
            person: PersonSheetConfig {
                sheet: "Respostas_ao_formulario_1".into(),
                key_column: "RE (Sem dígito):".into(),
                flag_column: "Quitado".into(),
                settled_value: "Sim".into(),
                amount_column: "TOTAL".into(),
                display_columns: vec![
                    "Graduação:".into(),
                    "Nome de Guerra:".into(),
                    "TOTAL".into(),
                    "Quitado".into(),
                ],
                text_columns: vec![
                    "RE (Sem dígito):".into(),
                    "Graduação:".into(),
                    "Nome de Guerra:".into(),
                    "Quitado".into(),
                    "IDENTIFICAÇÃO".into(),
                ],
            },
            cash_flow: CashFlowConfig {
                sheet: "FLUXO DE CAIXA".into(),
                date_column: "REGISTRO".into(),
                amount_column: "LANÇAMENTOS".into(),
                date_format: "%d/%m/%Y %H:%M:%S".into(),
            },
            withdrawals: WithdrawalConfig {
                sheet: "RETIRADAS".into(),
                header: vec![
                    "Data/Hora".into(),
                    "Motivo".into(),
                    "Local".into(),
                    "Produto/Descrição".into(),
                    "Valor".into(),
                ],
                timestamp_format: "%d/%m/%Y %H:%M:%S".into(),
                new_sheet_rows: 100,
                new_sheet_cols: 10,
            },
        }
    }
}
