/// Built-in values for every setting a sweep-plan file may omit. These reproduce the
/// reference DL_UPandLowSep sweep at 20 MHz.
pub struct DefaultsConfig {
    pub mode: String,
    pub bandwidth_mhz: u32,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    pub combinations: Vec<String>,
    pub template_dir: String,
    pub active_config: String,
    pub engine_program: String,
    pub engine_args: Vec<String>,
    pub engine_working_dir: String,
    pub results_root: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mode: "DL_UPandLowSep".to_string(),
            bandwidth_mhz: 20,
            start: 55.14,
            stop: 55.30,
            step: 0.04,
            combinations: vec!["CU-plane".to_string()],
            template_dir: "scratch".to_string(),
            active_config: "scratch/scen_ex.json".to_string(),
            engine_program: "./ns3".to_string(),
            engine_args: vec![
                "run".to_string(),
                "scratch/juniper-setupnewlinks.cc".to_string(),
            ],
            engine_working_dir: ".".to_string(),
            results_root: "sim_results".to_string(),
        }
    }
}

impl DefaultsConfig {
    pub fn template_file_name(bandwidth_mhz: u32, mode: &str) -> String {
        format!("scen_{}_{}.json", bandwidth_mhz, mode)
    }
}
