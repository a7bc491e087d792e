//! Classification prompt.

/// Build the classification prompt. The message is embedded verbatim.
pub fn build_classification_prompt(text: &str) -> String {
    format!(
        "Você é um assistente corporativo de uma empresa do setor financeiro. \
         Analise o email abaixo.\n\n\
         Tarefas:\n\
         1. Classifique o email como \"Produtivo\" (requer uma ação ou resposta: \
         solicitação de suporte, dúvida, atualização de status, problema técnico) \
         ou \"Improdutivo\" (não requer ação: felicitações, agradecimentos, \
         mensagens sociais, spam).\n\
         2. Gere uma resposta educada e profissional adequada à classificação.\n\n\
         Email: \"{text}\"\n\n\
         Responda ESTRITAMENTE com um objeto JSON neste formato, sem texto adicional:\n\
         {{\n  \"classification\": \"Produtivo\" ou \"Improdutivo\",\n  \
         \"suggested_response\": \"Texto da resposta sugerida\"\n}}"
    )
}
