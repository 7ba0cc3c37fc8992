/// The request body could not be turned into an OTLP export request.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid protobuf payload: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("invalid OTLP/JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decompress {encoding} payload: {source}")]
    Decompress {
        encoding: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported content-encoding '{0}'")]
    UnsupportedEncoding(String),

    #[error("{encoding} payload inflates beyond {limit} bytes")]
    TooLarge { encoding: String, limit: usize },
}

/// A decoded request could not be rendered or written to the output sink.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to serialize decoded batch: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to emit YAML document: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to write rendered document: {0}")]
    Sink(#[from] std::io::Error),
}
