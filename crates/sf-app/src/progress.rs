use sf_core::EquationId;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineStage {
    LoadingInputs,
    SelectingHotspots,
    ResolvingDependencies,
    RunningReferenceSimulation,
    CheckingCache { id: EquationId },
    Sampling { id: EquationId },
    EquationFinished { id: EquationId },
    WritingReport,
    Completed,
}

impl PipelineStage {
    pub fn label(&self) -> String {
        match self {
            PipelineStage::LoadingInputs => "loading inputs".to_string(),
            PipelineStage::SelectingHotspots => "selecting hotspots".to_string(),
            PipelineStage::ResolvingDependencies => "resolving dependencies".to_string(),
            PipelineStage::RunningReferenceSimulation => "reference simulation".to_string(),
            PipelineStage::CheckingCache { id } => format!("checking cache {id:?}"),
            PipelineStage::Sampling { id } => format!("sampling {id:?}"),
            PipelineStage::EquationFinished { id } => format!("finished {id:?}"),
            PipelineStage::WritingReport => "writing report".to_string(),
            PipelineStage::Completed => "completed".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineProgressEvent {
    pub stage: PipelineStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
}

impl PipelineProgressEvent {
    pub fn stage(stage: PipelineStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
        }
    }
}
