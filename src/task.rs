//! The task script handed to the agent.
//!
//! Holds the persona prompt, the step-by-step portal procedure (templated
//! with the user's credentials), and the sentinel the model must answer with
//! once both certificates are downloaded.

use crate::config::Credentials;

/// The exact reply that marks an attempt as successful.
pub const SUCCESS_SENTINEL: &str = "Listo! Ya descargue los PDFs!";

pub const SYSTEM_PROMPT: &str = "You are an expert AI assistant on helping people download their \
certificates from Sura by filling out forms and navigating through websites. \
You must use the tools provided to you to complete the task. \
You must return the message 'Listo! Ya descargue los PDFs!' if successful.";

const PORTAL_URL: &str = "https://sucursal.segurossura.com.co/#/portal/home";
const EPS_URL: &str = "https://portaleps.epssura.com/ServiciosUnClick/#";

/// Whether an attempt's output counts as success.
///
/// Exact, case- and whitespace-sensitive comparison with [`SUCCESS_SENTINEL`].
/// This is the only place success is decided.
pub fn is_success(output: &str) -> bool {
    output == SUCCESS_SENTINEL
}

/// The portal procedure for one set of credentials.
pub struct TaskScript<'a> {
    credentials: &'a Credentials,
}

impl<'a> TaskScript<'a> {
    pub fn new(credentials: &'a Credentials) -> Self {
        Self { credentials }
    }

    /// Keypad instructions: one click per passcode digit, in order, then a
    /// click outside the keyboard to close it.
    fn keypad_sequence(&self) -> String {
        let clicks = self
            .credentials
            .password
            .chars()
            .map(|digit| format!("click number {}", digit))
            .collect::<Vec<_>>()
            .join(", then ");
        format!(
            "So {}, then click with selector: #suraName to click outside the keyboard.",
            clicks
        )
    }

    /// Render the full prompt.
    pub fn render(&self) -> String {
        let cedula = &self.credentials.cedula;
        let password = &self.credentials.password;
        let keypad = self.keypad_sequence();

        format!(
            r#"
perform the following task:
1. Entrar a la siguiente página: {PORTAL_URL}:
    a. en el primer dropdown seleccionar CEDULA (la primera opcion value=C, no CEDULA DE EXTRANJERIA) (id: ctl00_ContentMain_suraType)
    b. llenar el numero de identificación: {cedula} (#suraName)
    c. la contraseña es: {password} (input #suraPassword) -> cannot be filled, needs to be clicked!!
    d. Click #session-internet button (Iniciar sesión) (selector: #session-internet)
2.
    a. Click en el boton con texto 'Otras opciones'
    b. Click en el boton con texto 'documentos y certificados'
3. Click la opción que diga ARL
4. Click la opción que dice Universidad CES
5. Click on "Continuar" button (ng-component > app-arl > main > app-seleccion-empresa > section > button)
6. Seleccionar la opción: certificado de afiliación
7. Call 'browser_click_and_extract_url' tool to extract the url of the PDF, since clicking the button would open a new tab and you cannot get the url of the new tab.
  buttonText: "Descargar"
  selector: "ng-component > app-descargar-certificados > div > div > form > button"
  waitTime: 20000

  DO NOT CALL 'browser_click'!!!!!
8. Pass the url to the download_file tool and call it (CANNOT MISS THIS STEP)
9. Navigate to '{EPS_URL}' AND WAIT FOR 0.1 SECONDS!!
10. Click button with selector: #navbarNav > div > ul > li:nth-child(11) > a
11. Click the button with aria-controls="afiliacionPBS" with selector: #page-content-wrapper > div > div > div > div:nth-child(2) > div > div.col-1 > button
12. Use the 'browser_click_and_download_authenticated' tool with parameters:
    buttonText: 'Generar certificado'
    selector: '#afiliacionPBS > div > div > form > div:nth-child(9) > div > button'
    waitTime: 20000

13. If successful, return the message '{SUCCESS_SENTINEL}'


For 1.c:
Make sure that the input text of 1.b has been filled in!!
The password presents one of those methods where if user clicks on the input, a keyboard appears (with only numbers).
Therefore, you need to click on the input, and then click on each number in the right order.
You can use 'data-value' to click on the right number.
For example, this is the element for the number 4:
<button role="button" aria-disabled="false" tabindex="-1" class="ui-keyboard-button ui-keyboard-52 ui-buttonkeyset-default" data-value="4" name="52" data-pos="0,1" title=""><span>4</span></button>
{keypad}

REMEMBER:
- you MAY NOT call 'browser_click' to download the PDF
- you MUST call 'browser_click_and_extract_url' AND THEN CALL 'download_file' to download the PDF
- you MUST return the message '{SUCCESS_SENTINEL}' if successful -> NOTHING ELSE
"#
        )
    }
}
